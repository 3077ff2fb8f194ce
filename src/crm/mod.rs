//! CRM access boundary
//!
//! `CrmApi` is the seam between the pipeline and the project-tracking API.
//! The live implementation is [`http::HttpCrm`]; tests and `--mock` use
//! [`crate::mock::MockCrm`].

use async_trait::async_trait;

pub mod http;
pub mod types;

pub use http::HttpCrm;
pub use types::{RawBoard, RawContact, RawPhase, RawRecord};

/// Errors from CRM operations
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Project/CRM API surface the core needs. All operations may fail with
/// transport or auth errors; none retry automatically.
#[async_trait]
pub trait CrmApi {
    /// List all workflow boards
    async fn list_boards(&self) -> Result<Vec<RawBoard>, CrmError>;

    /// List the phases of one board
    async fn list_phases(&self, board_id: u64) -> Result<Vec<RawPhase>, CrmError>;

    /// List open records, bounded to a single page of `limit` entries.
    /// Records beyond the limit are silently dropped; there is no
    /// pagination loop.
    async fn list_open_records(&self, limit: u32) -> Result<Vec<RawRecord>, CrmError>;

    /// Fetch one contact by id
    async fn get_contact(&self, id: u64) -> Result<RawContact, CrmError>;

    /// Push a corrected address to a contact record
    async fn update_contact_address(&self, id: u64, address: &str) -> Result<(), CrmError>;

    /// Move a record to a new phase
    async fn update_record_phase(&self, record_id: u64, phase_id: u64) -> Result<(), CrmError>;
}
