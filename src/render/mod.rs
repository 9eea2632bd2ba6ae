use std::fmt;
use std::fs;
use std::path::Path;

use geo::{Geometry, LineString};
use log::{info, warn};
use wkt::TryFromWkt;

use crate::config::MapStyle;
use crate::error::RenderError;
use crate::geometry::utm::SourceCrs;
use crate::model::ObjectDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Linear color ramp between two endpoints over a value range
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub low: Rgb,
    pub high: Rgb,
}

impl ColorScale {
    /// Scale spanning the smallest and largest of `values`, or `fallback` if empty
    pub fn from_values(values: impl IntoIterator<Item = f64>, fallback: (f64, f64), low: Rgb, high: Rgb) -> Self {
        let (min, max) = values
            .into_iter()
            .fold(None, |range: Option<(f64, f64)>, v| match range {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
            .unwrap_or(fallback);

        Self { min, max, low, high }
    }

    /// Color for `value`; channels are interpolated and truncated
    pub fn color(&self, value: f64) -> Rgb {
        let span = self.max - self.min;
        let t = if span > 0.0 {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let lerp = |lo: u8, hi: u8| (lo as f64 + (hi as f64 - lo as f64) * t) as u8;
        Rgb::new(
            lerp(self.low.r, self.high.r),
            lerp(self.low.g, self.high.g),
            lerp(self.low.b, self.high.b),
        )
    }
}

/// Parse a WKT line or multi-line string. Z and M ordinates are dropped.
pub fn parse_lines(wkt_text: &str) -> Result<Vec<LineString<f64>>, RenderError> {
    let geometry = Geometry::<f64>::try_from_wkt_str(wkt_text)
        .map_err(|e| RenderError::Geometry(e.to_string()))?;

    match geometry {
        Geometry::LineString(line) => Ok(vec![line]),
        Geometry::MultiLineString(lines) => Ok(lines.0),
        _ => Err(RenderError::Geometry(format!(
            "expected a line or multi-line string: {}",
            wkt_text
        ))),
    }
}

/// Reproject a line into `[lat, lng]` pairs
fn to_lat_lng(line: &LineString<f64>, crs: &SourceCrs) -> Vec<[f64; 2]> {
    line.coords()
        .map(|c| {
            let (lat, lng) = crs.to_lat_lng(c.x, c.y);
            [lat, lng]
        })
        .collect()
}

/// Integral volumes print without a fractional part
fn format_volume(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Build the Leaflet HTML page for `details`, skipping records that lack a
/// geometry or traffic volume and geometries that cannot be parsed
pub fn render_map(details: &[ObjectDetail], style: &MapStyle) -> String {
    let usable: Vec<(&str, f64)> = details
        .iter()
        .filter_map(|d| Some((d.geometry.as_deref()?, d.traffic_volume?)))
        .collect();

    let scale = ColorScale::from_values(
        usable.iter().map(|(_, v)| *v),
        style.fallback_range,
        style.low_color,
        style.high_color,
    );

    let mut html = String::new();
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <!-- generated {generated} -->
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css"/>
    <script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
</head>
<body>
    <div id="map" style="height: {height}px;"></div>
    <script>
        var map = L.map('map').setView([{lat}, {lng}], {zoom});
        L.tileLayer('{tiles}', {{
            attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors',
            opacity: {tile_opacity}
        }}).addTo(map);
"#,
        generated = chrono::Utc::now().to_rfc3339(),
        title = style.title,
        leaflet = style.leaflet_version,
        height = style.height_px,
        lat = style.center.0,
        lng = style.center.1,
        zoom = style.zoom,
        tiles = style.tile_url,
        tile_opacity = style.tile_opacity,
    ));

    let mut drawn = 0;
    for (wkt_text, volume) in usable {
        let lines = match parse_lines(wkt_text) {
            Ok(lines) => lines,
            Err(e) => {
                warn!("Skipping geometry: {}", e);
                continue;
            }
        };

        let color = scale.color(volume);
        for line in &lines {
            let coordinates = to_lat_lng(line, &style.source_crs);
            let coordinates = serde_json::to_string(&coordinates).unwrap_or_else(|_| "[]".to_string());
            html.push_str(&format!(
                r#"        L.polyline({coordinates}, {{
            color: '{color}',
            weight: {weight},
            opacity: {opacity}
        }}).addTo(map).bindPopup('ÅDT: {volume}');
"#,
                weight = style.line_weight,
                opacity = style.line_opacity,
                volume = format_volume(volume),
            ));
            drawn += 1;
        }
    }

    html.push_str("    </script>\n</body>\n</html>\n");
    info!("Rendered {} polylines", drawn);
    html
}

/// Render `details` and write the page to `path`
pub fn write_map<P: AsRef<Path>>(details: &[ObjectDetail], style: &MapStyle, path: P) -> Result<(), RenderError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, render_map(details, style))?;
    info!("Map HTML file generated as {}", path.display());
    Ok(())
}
