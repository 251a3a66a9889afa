//! AOI layers read through GDAL's vector drivers, and their reprojection to WGS84.
use super::AoiFormat;
use crate::error::{Error, Result};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry as GdalGeometry, LayerAccess};
use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use std::path::Path;
use tracing::{debug, warn};

/// One multi-polygon per feature of every layer, plus the spatial reference of the first layer
/// that declares one.
pub(super) fn read(
    path: &Path,
    format: AoiFormat,
) -> Result<(Vec<MultiPolygon<f64>>, Option<SpatialRef>)> {
    let options = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_READONLY | GdalOpenFlags::GDAL_OF_VECTOR,
        allowed_drivers: Some(format.driver_names()),
        ..Default::default()
    };
    let dataset = Dataset::open_ex(path, options).map_err(|source| Error::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut features = Vec::new();
    let mut srs = None;
    for mut layer in dataset.layers() {
        debug!("Reading layer '{}' of {:?}", layer.name(), path);
        if srs.is_none() {
            srs = layer.spatial_ref();
        }
        for feature in layer.features() {
            match feature.geometry() {
                Some(geometry) => features.push(polygons(geometry)?),
                None => warn!("Skipping a feature without geometry in {:?}", path),
            }
        }
    }
    Ok((features, srs))
}

fn polygons(geometry: &GdalGeometry) -> Result<MultiPolygon<f64>> {
    let name = geometry.geometry_name();
    flatten(geometry.to_geo()?).ok_or(Error::UnsupportedGeometry(name))
}

fn flatten(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        Geometry::MultiPolygon(multi_polygon) => Some(multi_polygon),
        Geometry::GeometryCollection(collection) => {
            let mut polygons = Vec::new();
            for member in collection {
                polygons.extend(flatten(member)?.0);
            }
            Some(MultiPolygon(polygons))
        }
        _ => None,
    }
}

pub(super) fn wgs84() -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_epsg(4326)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Reproject `features` from `source` to longitude/latitude on WGS84.
pub(super) fn to_wgs84(features: &mut [MultiPolygon<f64>], source: &SpatialRef) -> Result<()> {
    let target = wgs84()?;
    let mut source = source.clone();
    source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    if source == target {
        return Ok(());
    }

    let transform = CoordTransform::new(&source, &target)
        .map_err(|_| Error::UnsupportedCrs(describe(&source)))?;
    for feature in features.iter_mut() {
        let polygons = feature
            .iter()
            .map(|polygon| transform_polygon(&transform, polygon))
            .collect::<Result<Vec<_>>>()?;
        *feature = MultiPolygon(polygons);
    }
    Ok(())
}

fn describe(srs: &SpatialRef) -> String {
    match srs.name() {
        Some(name) if !name.is_empty() => name,
        _ => "unnamed definition".to_string(),
    }
}

fn transform_polygon(transform: &CoordTransform, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
    let exterior = transform_ring(transform, polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| transform_ring(transform, ring))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn transform_ring(transform: &CoordTransform, ring: &LineString<f64>) -> Result<LineString<f64>> {
    let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = ring.coords().map(|c| (c.x, c.y)).unzip();
    transform.transform_coords(&mut xs, &mut ys, &mut [])?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Coord { x, y })
        .collect())
}
