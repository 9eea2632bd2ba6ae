use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};

use crate::cache::RoadStore;
use crate::download::RoadDataSource;
use crate::error::{CacheError, FetchError};
use crate::geometry::BoundingBox;
use crate::model::{ObjectDetail, ObjectId, parse_catalog_ids, parse_object_detail};

/// The unit of remote work a failure is attributed to
#[derive(Debug, Clone, PartialEq)]
pub enum WorkUnit {
    Tile(BoundingBox),
    Object(ObjectId),
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnit::Tile(tile) => write!(f, "tile {}", tile),
            WorkUnit::Object(id) => write!(f, "object {}", id),
        }
    }
}

#[derive(Debug)]
pub struct Failure {
    pub unit: WorkUnit,
    pub error: FetchError,
}

/// Where a detail came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOrigin {
    Cache,
    Network,
}

/// Per-run record of what was fetched and what failed
#[derive(Debug, Default)]
pub struct FetchReport {
    pub ids_from_cache: bool,
    pub tiles_queried: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub failures: Vec<Failure>,
}

impl FetchReport {
    fn fail(&mut self, unit: WorkUnit, error: FetchError) {
        warn!("Failed to fetch {}: {}", unit, error);
        self.failures.push(Failure { unit, error });
    }

    pub fn tile_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.unit, WorkUnit::Tile(_)))
            .count()
    }

    pub fn object_failures(&self) -> usize {
        self.failures.len() - self.tile_failures()
    }

    pub fn log_summary(&self) {
        if self.ids_from_cache {
            info!("Object ids loaded from cache");
        } else {
            info!(
                "Queried {} tiles, {} failed",
                self.tiles_queried,
                self.tile_failures()
            );
        }
        info!(
            "Details: {} from cache, {} fetched, {} failed",
            self.cache_hits,
            self.fetched,
            self.object_failures()
        );
        for failure in &self.failures {
            warn!("  {}: {}", failure.unit, failure.error);
        }
    }
}

/// Output of one pipeline run
#[derive(Debug, Default)]
pub struct RunOutput {
    pub ids: Vec<ObjectId>,
    pub details: Vec<(ObjectId, ObjectDetail)>,
    pub report: FetchReport,
}

impl RunOutput {
    /// Details carrying both geometry and traffic volume
    pub fn usable(&self) -> Vec<ObjectDetail> {
        self.details
            .iter()
            .map(|(_, detail)| detail)
            .filter(|detail| detail.is_usable())
            .cloned()
            .collect()
    }
}

/// List the object ids inside one tile
pub fn fetch_catalog_ids<S: RoadDataSource + ?Sized>(
    source: &S,
    tile: &BoundingBox,
) -> Result<Vec<ObjectId>, FetchError> {
    let body = source.fetch_catalog(tile)?;
    parse_catalog_ids(&body)
}

/// Query every tile and union the results. A failed tile contributes no ids.
pub fn aggregate_ids<S: RoadDataSource + ?Sized>(
    source: &S,
    tiles: &[BoundingBox],
    report: &mut FetchReport,
) -> Vec<ObjectId> {
    let mut ids = BTreeSet::new();

    for tile in tiles {
        info!("Fetching data for sub-box: {}", tile);
        report.tiles_queried += 1;
        match fetch_catalog_ids(source, tile) {
            Ok(tile_ids) => {
                debug!("{} objects in {}", tile_ids.len(), tile);
                ids.extend(tile_ids);
            }
            Err(e) => report.fail(WorkUnit::Tile(*tile), e),
        }
    }

    ids.into_iter().collect()
}

/// Cache-first detail fetcher over a remote source and a persistent store
pub struct Pipeline<'a, S: RoadDataSource + ?Sized, C: RoadStore + ?Sized> {
    source: &'a S,
    store: &'a mut C,
    attribute_code: u64,
}

impl<'a, S: RoadDataSource + ?Sized, C: RoadStore + ?Sized> Pipeline<'a, S, C> {
    pub fn new(source: &'a S, store: &'a mut C, attribute_code: u64) -> Self {
        Self {
            source,
            store,
            attribute_code,
        }
    }

    /// Return the persisted id set, or query every tile and persist the union.
    /// Failed tiles contribute no ids; the union of the others is still persisted.
    pub fn collect_ids(
        &mut self,
        tiles: &[BoundingBox],
        report: &mut FetchReport,
    ) -> Result<Vec<ObjectId>, CacheError> {
        if let Some(ids) = self.store.load_ids()? {
            info!("Loaded {} object ids from cache", ids.len());
            report.ids_from_cache = true;
            let unique: BTreeSet<ObjectId> = ids.into_iter().collect();
            return Ok(unique.into_iter().collect());
        }

        let ids = aggregate_ids(self.source, tiles, report);
        if report.tile_failures() > 0 {
            warn!(
                "{} of {} tiles failed, persisting the ids of the remaining tiles",
                report.tile_failures(),
                tiles.len()
            );
        }
        self.store.save_ids(&ids)?;
        info!("Saved {} object ids", ids.len());

        Ok(ids)
    }

    /// Return the detail for `id`, reading the store first.
    ///
    /// On a miss the raw response is persisted before any field is extracted.
    pub fn fetch_detail(&mut self, id: ObjectId) -> Result<(ObjectDetail, DetailOrigin), FetchError> {
        if let Some(body) = self.store.get_detail(id)? {
            debug!("Object {} loaded from cache", id);
            let detail = parse_object_detail(&body, self.attribute_code)?;
            return Ok((detail, DetailOrigin::Cache));
        }

        let body = self.source.fetch_detail(id)?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        if !value.is_object() {
            return Err(FetchError::Payload(format!(
                "expected a JSON object for object {}",
                id
            )));
        }

        if let Err(e) = self.store.put_detail(id, &body) {
            warn!("Failed to cache object {}: {}", id, e);
        } else {
            debug!("Object {} details saved", id);
        }

        let detail = parse_object_detail(&body, self.attribute_code)?;
        Ok((detail, DetailOrigin::Network))
    }

    /// Fetch every id in order. A failed id yields an empty detail.
    pub fn fetch_details(
        &mut self,
        ids: &[ObjectId],
        report: &mut FetchReport,
    ) -> Vec<(ObjectId, ObjectDetail)> {
        let mut details = Vec::with_capacity(ids.len());

        for &id in ids {
            let detail = match self.fetch_detail(id) {
                Ok((detail, DetailOrigin::Cache)) => {
                    report.cache_hits += 1;
                    detail
                }
                Ok((detail, DetailOrigin::Network)) => {
                    report.fetched += 1;
                    detail
                }
                Err(e) => {
                    report.fail(WorkUnit::Object(id), e);
                    ObjectDetail::default()
                }
            };
            details.push((id, detail));
        }

        details
    }

    /// Collect ids over `tiles`, then fetch every detail
    pub fn run(&mut self, tiles: &[BoundingBox]) -> Result<RunOutput, CacheError> {
        let mut report = FetchReport::default();
        let ids = self.collect_ids(tiles, &mut report)?;
        let details = self.fetch_details(&ids, &mut report);

        Ok(RunOutput { ids, details, report })
    }
}

/// A source for cache-only runs: every request fails without network access
pub struct OfflineSource;

impl RoadDataSource for OfflineSource {
    fn fetch_catalog(&self, tile: &BoundingBox) -> Result<String, FetchError> {
        Err(FetchError::Transport(format!("offline, cannot query {}", tile)))
    }

    fn fetch_detail(&self, id: ObjectId) -> Result<String, FetchError> {
        Err(FetchError::NotCached(id))
    }
}
