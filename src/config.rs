use std::time::Duration;

use crate::geometry::utm::SourceCrs;
use crate::render::Rgb;

/// Endpoint and protocol settings for the NVDB read API
#[derive(Debug, Clone)]
pub struct NvdbConfig {
    /// Base URL of the road object type being queried
    pub base_url: String,
    /// Municipality filter (`kommune`)
    pub municipality: u32,
    /// Object version requested by the detail query
    pub version: u32,
    /// Relation traversal depth (`dybde`) for the detail query
    pub depth: u32,
    /// Property code holding the traffic volume
    pub traffic_volume_code: u64,
    pub accept: String,
    pub client: String,
    pub client_session: String,
    pub timeout: Duration,
}

impl Default for NvdbConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nvdbapiles-v3.atlas.vegvesen.no/vegobjekter/540".to_string(),
            municipality: 5001,
            version: 1,
            depth: 1,
            traffic_volume_code: 4623,
            accept: "application/vnd.vegvesen.nvdb-v3-rev1+json, application/json".to_string(),
            client: "Vegkart".to_string(),
            client_session: "f494b285-ec81-436c-ae44-a852ecceab42".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Settings for the generated Leaflet map
#[derive(Debug, Clone)]
pub struct MapStyle {
    pub title: String,
    pub source_crs: SourceCrs,
    pub center: (f64, f64),
    pub zoom: u8,
    pub leaflet_version: String,
    pub tile_url: String,
    pub tile_opacity: f64,
    pub line_weight: u32,
    pub line_opacity: f64,
    pub low_color: Rgb,
    pub high_color: Rgb,
    /// Scale used when no record carries a traffic volume
    pub fallback_range: (f64, f64),
    pub height_px: u32,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            title: "Road Map".to_string(),
            source_crs: SourceCrs::default(),
            // Trondheim
            center: (63.4305, 10.3951),
            zoom: 12,
            leaflet_version: "1.7.1".to_string(),
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_opacity: 0.3,
            line_weight: 3,
            line_opacity: 1.0,
            low_color: Rgb::new(0, 255, 0),
            high_color: Rgb::new(255, 0, 0),
            fallback_range: (0.0, 10000.0),
            height_px: 1500,
        }
    }
}
