//! fleetmap — dispatcher dashboard core
//!
//! Pulls open delivery and service jobs from a CRM-style project API,
//! classifies them by workflow board and phase, resolves client addresses
//! to coordinates under a strict geocoder rate limit, and maintains a
//! last-known-good snapshot so the dispatcher always has something to look
//! at while a slow refresh runs.

pub mod advice;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod crm;
pub mod geocode;
pub mod job;
pub mod mock;
pub mod pipeline;
pub mod service;
pub mod stage;

pub use cache::{CacheError, Snapshot, SnapshotCache};
pub use classifier::{BoardResolution, ClassifyConfig, ClassifyError, PhaseIndex};
pub use config::{AppConfig, ConfigError};
pub use crm::{CrmApi, CrmError, HttpCrm};
pub use geocode::{GeoError, GeoFetch, GeoResolver, MinIntervalLimiter, NominatimFetch};
pub use job::{GeoPoint, Job, JobStatus, JobType};
pub use pipeline::{FetchError, FetchPipeline};
pub use service::{DispatchError, Dispatcher};
pub use stage::{AdvanceConfig, AdvanceError, StageAdvancer};
