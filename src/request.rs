//! Request documents for the quick-search and Orders APIs.
use crate::error::Result;
use crate::settings::ProductSettings;
use crate::time_range::TimeRange;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "geojson";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

/// Node of a Planet search filter tree.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum Filter {
    AndFilter {
        config: Vec<Filter>,
    },
    GeometryFilter {
        field_name: String,
        config: geojson::Geometry,
    },
    DateRangeFilter {
        field_name: String,
        config: DateRange,
    },
    PermissionFilter {
        config: Vec<String>,
    },
    AssetFilter {
        config: Vec<String>,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub item_types: Vec<String>,
    pub filter: Filter,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub item_ids: Vec<String>,
    pub item_type: String,
    pub product_bundle: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Clip { aoi: geojson::Geometry },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub name: String,
    pub products: Vec<Product>,
    pub tools: Vec<Tool>,
}

/// Scenes intersecting `geometry`, acquired within `time_range`, that the account may download
/// and that carry the configured asset.
pub fn build_search_filter(
    geometry: &geojson::Geometry,
    time_range: &TimeRange,
    product: &ProductSettings,
) -> SearchRequest {
    let filter = Filter::AndFilter {
        config: vec![
            Filter::GeometryFilter {
                field_name: "geometry".to_string(),
                config: geometry.clone(),
            },
            Filter::DateRangeFilter {
                field_name: "acquired".to_string(),
                config: DateRange {
                    gte: Some(time_range.gte()),
                    lte: Some(time_range.lte()),
                },
            },
            Filter::PermissionFilter {
                config: vec![product.permission.clone()],
            },
            Filter::AssetFilter {
                config: vec![product.asset_type.clone()],
            },
        ],
    };

    SearchRequest {
        item_types: vec![product.item_type.clone()],
        filter,
    }
}

pub fn build_order(
    image_ids: &[String],
    geometry: &geojson::Geometry,
    product: &ProductSettings,
) -> OrderRequest {
    OrderRequest {
        name: product.order_name.clone(),
        products: vec![Product {
            item_ids: image_ids.to_vec(),
            item_type: product.item_type.clone(),
            product_bundle: product.product_bundle.clone(),
        }],
        tools: vec![Tool::Clip {
            aoi: geometry.clone(),
        }],
    }
}

/// `path` with `.geojson` appended unless it already ends that way.
pub fn document_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.extension().is_some_and(|e| e == DOCUMENT_EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(DOCUMENT_EXTENSION);
    PathBuf::from(name)
}

/// Write `document` as pretty JSON and return the path actually written.
pub fn write_document<T: Serialize, P: AsRef<Path>>(document: &T, path: P) -> Result<PathBuf> {
    let path = document_path(path);
    let content = serde_json::to_string_pretty(document)?;
    fs::write(&path, content)?;
    Ok(path)
}

pub fn read_document<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = fs::read_to_string(document_path(path))?;
    let document: T = serde_json::from_str(&content)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn aoi() -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![-121.5, 38.5],
            vec![-121.4, 38.5],
            vec![-121.4, 38.6],
            vec![-121.5, 38.5],
        ]]))
    }

    fn time_range() -> TimeRange {
        TimeRange::parse("2020-08-01", "2021-09-12").unwrap()
    }

    #[test]
    fn test_search_filter() {
        let request = build_search_filter(&aoi(), &time_range(), &ProductSettings::default());
        assert_eq!(request.item_types, vec!["PSScene"]);

        let Filter::AndFilter { config } = &request.filter else {
            panic!("top level filter should be an AndFilter");
        };
        assert_eq!(config.len(), 4);
        assert_eq!(
            config[1],
            Filter::DateRangeFilter {
                field_name: "acquired".to_string(),
                config: DateRange {
                    gte: Some("2020-08-01T00:00:00Z".to_string()),
                    lte: Some("2021-09-12T00:00:00Z".to_string()),
                },
            }
        );
    }

    #[test]
    fn test_search_filter_json() {
        let request = build_search_filter(&aoi(), &time_range(), &ProductSettings::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["filter"]["type"], "AndFilter");
        let children = value["filter"]["config"].as_array().unwrap();
        assert_eq!(children[0]["type"], "GeometryFilter");
        assert_eq!(children[0]["field_name"], "geometry");
        assert_eq!(children[0]["config"]["type"], "Polygon");
        assert_eq!(children[1]["config"]["gte"], "2020-08-01T00:00:00Z");
        assert_eq!(
            children[2],
            json!({"type": "PermissionFilter", "config": ["assets.analytic:download"]})
        );
        assert_eq!(
            children[3],
            json!({"type": "AssetFilter", "config": ["ortho_visual"]})
        );
    }

    #[test]
    fn test_search_filter_uses_product_settings() {
        let product = ProductSettings {
            item_type: "SkySatScene".to_string(),
            asset_type: "ortho_panchromatic".to_string(),
            ..Default::default()
        };
        let request = build_search_filter(&aoi(), &time_range(), &product);
        assert_eq!(request.item_types, vec!["SkySatScene"]);
        let Filter::AndFilter { config } = &request.filter else {
            panic!("top level filter should be an AndFilter");
        };
        assert_eq!(
            config[3],
            Filter::AssetFilter {
                config: vec!["ortho_panchromatic".to_string()]
            }
        );
    }

    #[test]
    fn test_build_order() {
        let ids = vec!["id1".to_string(), "id2".to_string()];
        let order = build_order(&ids, &aoi(), &ProductSettings::default());

        assert_eq!(order.name, "simple order");
        assert_eq!(order.products.len(), 1);
        assert_eq!(order.products[0].item_ids, ids);
        assert_eq!(order.products[0].item_type, "PSScene");
        assert_eq!(order.products[0].product_bundle, "visual");
        assert_eq!(order.tools, vec![Tool::Clip { aoi: aoi() }]);

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["tools"][0]["clip"]["aoi"]["type"], "Polygon");
        assert_eq!(value["products"][0]["item_ids"], json!(["id1", "id2"]));
    }

    #[test]
    fn test_document_path() {
        assert_eq!(
            document_path("requests/search"),
            PathBuf::from("requests/search.geojson")
        );
        assert_eq!(
            document_path("requests/order.geojson"),
            PathBuf::from("requests/order.geojson")
        );
        assert_eq!(document_path("order.json"), PathBuf::from("order.json.geojson"));
    }

    #[test]
    fn test_search_document_round_trip() {
        let dir = tempdir().unwrap();
        let request = build_search_filter(&aoi(), &time_range(), &ProductSettings::default());

        let written = write_document(&request, dir.path().join("search")).unwrap();
        assert_eq!(written, dir.path().join("search.geojson"));

        let read: SearchRequest = read_document(&written).unwrap();
        assert_eq!(read, request);
    }

    #[test]
    fn test_order_document_round_trip() {
        let dir = tempdir().unwrap();
        let order = build_order(&["a".to_string()], &aoi(), &ProductSettings::default());

        write_document(&order, dir.path().join("order")).unwrap();
        let read: OrderRequest = read_document(dir.path().join("order")).unwrap();
        assert_eq!(read, order);
    }
}
