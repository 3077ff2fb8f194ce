//! Dispatcher-facing operations
//!
//! `Dispatcher` owns the live job list and the collaborators behind it and
//! exposes the operations the UI drives: refresh, stage advance, manual
//! address correction, advisory text. Mutation paths never interleave;
//! each is awaited to completion before another can start.

use tracing::{info, warn};

use crate::advice;
use crate::cache::SnapshotCache;
use crate::config::AppConfig;
use crate::crm::{CrmApi, CrmError};
use crate::geocode::{GeoFetch, GeoResolver};
use crate::job::{Job, JobStatus};
use crate::pipeline::{FetchError, FetchPipeline};
use crate::stage::{AdvanceError, StageAdvancer};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The id is not in the live list. Also the failure mode of a second
    /// advance of an already-advanced job: success removes the job, so a
    /// repeat cannot silently succeed.
    #[error("no job with id {0} in the live list")]
    UnknownJob(u64),

    #[error("address must not be blank")]
    BlankAddress,

    #[error("address did not geocode: {0}")]
    Ungeocodable(String),

    #[error(transparent)]
    Advance(#[from] AdvanceError),

    #[error(transparent)]
    Crm(#[from] CrmError),
}

/// Owns the live job list and the service collaborators
pub struct Dispatcher<C, F> {
    config: AppConfig,
    crm: C,
    geo: GeoResolver<F>,
    cache: SnapshotCache,
    advancer: StageAdvancer,
    jobs: Vec<Job>,
}

impl<C: CrmApi, F: GeoFetch> Dispatcher<C, F> {
    pub fn new(config: AppConfig, crm: C, geo_fetch: F, cache: SnapshotCache) -> Self {
        let geo = GeoResolver::with_interval(geo_fetch, config.geocode_min_interval());
        let advancer = StageAdvancer::new(config.advance.clone());
        Self {
            config,
            crm,
            geo,
            cache,
            advancer,
            jobs: Vec::new(),
        }
    }

    /// Current live job list
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn crm(&self) -> &C {
        &self.crm
    }

    pub fn geo_fetch(&self) -> &F {
        self.geo.fetch()
    }

    /// Seed the live list from the snapshot cache. Returns the number of
    /// jobs seeded; zero means no usable snapshot.
    pub fn load_cached(&mut self) -> usize {
        match self.cache.load_jobs() {
            Some(jobs) => {
                self.jobs = jobs;
                self.jobs.len()
            }
            None => 0,
        }
    }

    /// The cached snapshot, untouched by this call
    pub fn cached_snapshot(&self) -> Option<Vec<Job>> {
        self.cache.load_jobs()
    }

    /// Run a full refresh. On success the live list is replaced (and the
    /// snapshot persisted by the pipeline for non-empty results); on
    /// failure both are left untouched.
    pub async fn refresh(&mut self) -> Result<&[Job], FetchError> {
        let mut pipeline =
            FetchPipeline::new(&self.crm, &mut self.geo, &self.cache, &self.config);
        let fresh = pipeline.run().await?;
        info!(jobs = fresh.len(), "refresh complete");
        self.jobs = fresh;
        Ok(&self.jobs)
    }

    /// Advance a job to its type-specific done phase. On success the job
    /// leaves the live list and is evicted from the snapshot so a reload
    /// cannot resurrect it.
    pub async fn advance_stage(&mut self, id: u64) -> Result<(), DispatchError> {
        let job_type = self
            .jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or(DispatchError::UnknownJob(id))?
            .job_type;

        self.advancer.advance(&self.crm, id, job_type).await?;

        self.jobs.retain(|j| j.id != id);
        if let Err(e) = self.cache.evict(id) {
            warn!(id, error = %e, "could not evict advanced job from snapshot");
        }
        Ok(())
    }

    /// Correct a job's address: push upstream when a contact is linked,
    /// re-geocode, then patch the job in place (live list and snapshot).
    /// Any failure leaves the job unchanged.
    pub async fn update_address(&mut self, id: u64, new_address: &str) -> Result<(), DispatchError> {
        let trimmed = new_address.trim();
        if trimmed.is_empty() {
            return Err(DispatchError::BlankAddress);
        }

        let person_id = self
            .jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or(DispatchError::UnknownJob(id))?
            .person_id;

        if let Some(contact_id) = person_id {
            self.crm.update_contact_address(contact_id, trimmed).await?;
        }

        let coordinates = self
            .geo
            .resolve(trimmed)
            .await
            .ok_or_else(|| DispatchError::Ungeocodable(trimmed.to_string()))?;

        // Lookup again for the mutable patch; the id was present above and
        // nothing interleaves.
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            job.address = trimmed.to_string();
            job.coordinates = Some(coordinates);
            job.status = JobStatus::Open;

            let patched = job.clone();
            if let Err(e) = self.cache.patch(&patched) {
                warn!(id, error = %e, "could not patch snapshot after address update");
            }
        }
        Ok(())
    }

    /// Advisory text for one job; always returns a string (fallbacks on
    /// any advisory failure)
    pub async fn advice_for(&self, id: u64) -> Result<String, DispatchError> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or(DispatchError::UnknownJob(id))?;
        Ok(advice::generate(&self.config.advice, job).await)
    }
}
