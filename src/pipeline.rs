//! Full fetch pipeline
//!
//! Orchestrates one complete refresh: fetch boards, resolve the two
//! category boards and their phases, fetch open records, classify them,
//! then sequentially resolve each record's contact and address and geocode
//! it, and assemble the normalized job list. On success with at least one
//! job the snapshot cache is replaced; on any batch-level failure the
//! caller gets an error and neither the live list nor the cache changes.
//!
//! Step ordering is deliberate: the two phase fetches run concurrently
//! (different, unconstrained API), but per-record contact lookups and
//! geocoding are strictly sequential because the geocoder enforces a hard
//! external rate limit. A full refresh over many jobs is slow by design.

use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::classifier::{BoardResolution, ClassifyError, PhaseIndex};
use crate::config::AppConfig;
use crate::crm::types::{RawBoard, RawPhase, RawRecord};
use crate::crm::{CrmApi, CrmError};
use crate::geocode::{GeoFetch, GeoResolver};
use crate::job::{Job, JobStatus, JobType, UNKNOWN_CLIENT};

/// Batch-level fetch failure, distinct from a successful empty result so
/// callers can keep showing stale data instead of clearing it
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// One full refresh over borrowed collaborators
pub struct FetchPipeline<'a, C, F> {
    crm: &'a C,
    geo: &'a mut GeoResolver<F>,
    cache: &'a SnapshotCache,
    config: &'a AppConfig,
}

impl<'a, C: CrmApi, F: GeoFetch> FetchPipeline<'a, C, F> {
    pub fn new(
        crm: &'a C,
        geo: &'a mut GeoResolver<F>,
        cache: &'a SnapshotCache,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            crm,
            geo,
            cache,
            config,
        }
    }

    /// Run the full fetch. Per-record contact failures are absorbed; any
    /// failure before the batch completes fails the whole operation.
    pub async fn run(&mut self) -> Result<Vec<Job>, FetchError> {
        info!("fetching workflow boards");
        let boards = self.crm.list_boards().await?;
        debug!(count = boards.len(), "boards fetched");

        let resolution = BoardResolution::resolve(&boards, &self.config.classify)?;
        if resolution.transport.is_none() {
            warn!("no transport board matched; transport jobs will be absent");
        }
        if resolution.service.is_none() {
            warn!("no service board matched; service jobs will be absent");
        }

        info!("fetching phases");
        let (transport_phases, service_phases) = tokio::join!(
            fetch_board_phases(self.crm, resolution.transport.as_ref()),
            fetch_board_phases(self.crm, resolution.service.as_ref()),
        );
        let transport_phases = transport_phases?;
        let service_phases = service_phases?;

        let index = PhaseIndex::build(&transport_phases, &service_phases, &self.config.classify);
        let (transport_active, service_active) = index.active_count();
        debug!(transport_active, service_active, "active phase sets built");

        info!(limit = self.config.record_limit, "fetching open records");
        let records = self.crm.list_open_records(self.config.record_limit).await?;
        debug!(count = records.len(), "raw records fetched");

        let classified: Vec<(RawRecord, JobType)> = records
            .into_iter()
            .filter_map(|record| index.classify(record.phase_id).map(|t| (record, t)))
            .collect();

        let transport_count = classified
            .iter()
            .filter(|(_, t)| *t == JobType::Transport)
            .count();
        info!(
            total = classified.len(),
            transport = transport_count,
            service = classified.len() - transport_count,
            "records classified"
        );

        let mut jobs = Vec::with_capacity(classified.len());
        for (processed, (record, job_type)) in classified.iter().enumerate() {
            if processed > 0 && processed % 5 == 0 {
                info!(processed, total = classified.len(), "geocoding progress");
            }
            jobs.push(self.assemble_job(record, *job_type, &index).await);
        }

        if jobs.is_empty() {
            debug!("refresh produced no jobs; snapshot kept");
        } else if let Err(e) = self.cache.replace(&jobs) {
            // Jobs are good even if persistence is not; degrade to an
            // unsaved snapshot rather than failing the refresh.
            warn!(error = %e, "could not persist snapshot");
        }

        Ok(jobs)
    }

    /// Resolve one record's contact and address, geocode it, and build the
    /// normalized job. Contact-lookup failure is non-fatal: the job keeps
    /// default fields.
    async fn assemble_job(&mut self, record: &RawRecord, job_type: JobType, index: &PhaseIndex) -> Job {
        let mut client_name = UNKNOWN_CLIENT.to_string();
        let mut address = String::new();
        let mut phone = None;

        let person_id = record.contact_id();
        if let Some(contact_id) = person_id {
            match self.crm.get_contact(contact_id).await {
                Ok(contact) => {
                    client_name = contact.name.clone();
                    if let Some(found) =
                        contact.best_address(self.config.custom_address_field.as_deref())
                    {
                        address = found;
                    }
                    phone = contact.first_phone();
                }
                Err(e) => {
                    warn!(
                        record = record.id,
                        contact = contact_id,
                        error = %e,
                        "contact lookup failed; keeping defaults"
                    );
                }
            }
        }

        let coordinates = self.geo.resolve(&address).await;

        Job {
            id: record.id,
            title: record.title.clone(),
            client_name,
            status: JobStatus::derive(coordinates, &address),
            coordinates,
            phase_name: index.phase_name(record.phase_id),
            address,
            phone,
            person_id,
            job_type,
        }
    }
}

async fn fetch_board_phases<C: CrmApi>(
    crm: &C,
    board: Option<&RawBoard>,
) -> Result<Vec<RawPhase>, CrmError> {
    match board {
        Some(board) => crm.list_phases(board.id).await,
        None => Ok(Vec::new()),
    }
}
