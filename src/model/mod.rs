use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;

/// NVDB road object identifier
pub type ObjectId = u64;

/// Geometry and traffic volume for one road object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectDetail {
    /// WKT line or multi-line string in the source CRS
    pub geometry: Option<String>,
    /// Annual average daily traffic (ÅDT)
    pub traffic_volume: Option<f64>,
}

impl ObjectDetail {
    pub fn new(geometry: impl Into<String>, traffic_volume: Option<f64>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            traffic_volume,
        }
    }

    /// A detail can be drawn only when both fields are present
    pub fn is_usable(&self) -> bool {
        self.geometry.is_some() && self.traffic_volume.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    objekter: Vec<CatalogObject>,
}

#[derive(Debug, Deserialize)]
struct CatalogObject {
    id: ObjectId,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    geometri: Option<Geometri>,
    #[serde(default)]
    egenskaper: Vec<Egenskap>,
}

#[derive(Debug, Deserialize)]
struct Geometri {
    #[serde(default)]
    wkt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Egenskap {
    id: u64,
    #[serde(default)]
    verdi: Option<Value>,
}

/// Extract the object ids from a catalog response body
pub fn parse_catalog_ids(body: &str) -> Result<Vec<ObjectId>, FetchError> {
    let response: CatalogResponse = serde_json::from_str(body)?;
    Ok(response.objekter.into_iter().map(|obj| obj.id).collect())
}

/// Extract geometry and the property with code `attribute_code` from a detail response body
pub fn parse_object_detail(body: &str, attribute_code: u64) -> Result<ObjectDetail, FetchError> {
    let response: DetailResponse = serde_json::from_str(body)?;

    let geometry = response.geometri.and_then(|g| g.wkt);
    let traffic_volume = response
        .egenskaper
        .iter()
        .filter(|egenskap| egenskap.id == attribute_code)
        .filter_map(|egenskap| egenskap.verdi.as_ref().and_then(Value::as_f64))
        .last();

    Ok(ObjectDetail { geometry, traffic_volume })
}
