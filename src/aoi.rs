//! Loading and validating the area of interest.
//!
//! The Planet APIs want a single GeoJSON geometry in EPSG:4326 with no more than 500 vertices
//! and an area of at least one square metre. [`prepare_geometry`] reads a shapefile, KML or
//! GeoJSON file through GDAL, reprojects it, checks those limits and unions everything into one
//! geometry.
mod area;
mod vector;

pub use area::ellipsoidal_area_m2;

use crate::error::{Error, Result};
use gdal::spatial_ref::SpatialRef;
use geo::{CoordsIter, Geometry, MultiPolygon, Polygon};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MAX_VERTICES: usize = 500;

/// Square metres.
pub const MIN_AREA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoiFormat {
    Shapefile,
    Kml,
    GeoJson,
}

impl AoiFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("shp") => Ok(Self::Shapefile),
            Some("kml") => Ok(Self::Kml),
            Some("json") | Some("geojson") => Ok(Self::GeoJson),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// GDAL drivers allowed to open the format.
    pub fn driver_names(self) -> &'static [&'static str] {
        match self {
            Self::Shapefile => &["ESRI Shapefile"],
            Self::Kml => &["LIBKML", "KML"],
            Self::GeoJson => &["GeoJSON"],
        }
    }
}

/// The polygons of an AOI file, one entry per feature, in the file's own CRS.
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    pub source: PathBuf,
    pub features: Vec<MultiPolygon<f64>>,
    /// `None` when the file declares no CRS, which is read as WGS84 longitude/latitude.
    pub crs: Option<SpatialRef>,
}

impl AreaOfInterest {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = AoiFormat::from_path(path)?;
        let (features, crs) = vector::read(path, format)?;
        if crs.is_none() {
            warn!("No CRS declared by {:?}, assuming WGS84 longitude/latitude", path);
        }
        Ok(Self {
            source: path.to_path_buf(),
            features,
            crs,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.features.iter().map(|f| f.coords_count()).sum()
    }

    /// Reproject every feature to WGS84 longitude/latitude.
    pub fn into_wgs84(mut self) -> Result<Self> {
        if let Some(crs) = &self.crs {
            vector::to_wgs84(&mut self.features, crs)?;
        }
        self.crs = Some(vector::wgs84()?);
        Ok(self)
    }
}

/// A validated AOI in EPSG:4326, ready to be put into search and order requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAoi {
    pub geometry: Geometry<f64>,
    pub feature_count: usize,
    pub vertex_count: usize,
    pub area: f64,
}

impl PreparedAoi {
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.geometry))
    }
}

pub fn prepare_geometry<P: AsRef<Path>>(path: P) -> Result<PreparedAoi> {
    let aoi = AreaOfInterest::read(path)?;
    prepare(aoi)
}

/// Validate `aoi` and union its features. Checks run cheapest first so that an oversized input
/// is rejected before any reprojection.
pub fn prepare(aoi: AreaOfInterest) -> Result<PreparedAoi> {
    let feature_count = aoi.features.len();
    if feature_count == 0 {
        return Err(Error::EmptyInput(aoi.source));
    }
    if feature_count > 1 {
        info!("MultiPolygon feature detected ({} features)", feature_count);
    }

    let vertex_count = aoi.vertex_count();
    if vertex_count > MAX_VERTICES {
        return Err(Error::TooManyVertices {
            count: vertex_count,
            limit: MAX_VERTICES,
        });
    }

    let aoi = aoi.into_wgs84()?;

    let area = ellipsoidal_area_m2(&aoi.features);
    if area < MIN_AREA {
        return Err(Error::AreaTooSmall { area });
    }

    let geometry = union(aoi.features);
    info!(
        "AOI prepared: {} feature(s), {} vertices, {:.1} m²",
        feature_count, vertex_count, area
    );

    Ok(PreparedAoi {
        geometry,
        feature_count,
        vertex_count,
        area,
    })
}

fn union(features: Vec<MultiPolygon<f64>>) -> Geometry<f64> {
    let polygons: Vec<Polygon<f64>> = features.into_iter().flat_map(|f| f.0).collect();
    let mut unioned = if polygons.len() == 1 {
        MultiPolygon(polygons)
    } else {
        geo::unary_union(polygons.iter())
    };
    if unioned.0.len() == 1 {
        Geometry::Polygon(unioned.0.remove(0))
    } else {
        Geometry::MultiPolygon(unioned)
    }
}
