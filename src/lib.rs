//! Acquisition and mapping of NVDB traffic-volume road segments.
//!
//! A bounding box is split into tiles, each tile is queried for road object
//! ids, the details of every id are fetched through an on-disk cache, and the
//! segments are drawn on a Leaflet map colored by traffic volume.

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod render;

pub use cache::{Cache, MemoryStore, RoadStore};
pub use config::{MapStyle, NvdbConfig};
pub use download::{NvdbClient, RoadDataSource};
pub use geometry::{BoundingBox, partition};
pub use model::{ObjectDetail, ObjectId};
pub use pipeline::{FetchReport, OfflineSource, Pipeline, RunOutput};
