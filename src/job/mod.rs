//! Normalized job entities
//!
//! `Job` is the unit everything downstream of the fetch pipeline consumes:
//! the map layer, the stage advancer and the snapshot cache all work on this
//! shape and never see raw CRM payloads.

use serde::{Deserialize, Serialize};

/// Client name used when the contact lookup fails or no contact is linked
pub const UNKNOWN_CLIENT: &str = "Unknown";

/// Phase name used when a record's phase id is not in the fetched lookup
pub const UNKNOWN_PHASE: &str = "Unknown Phase";

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Job category. Assigned once during classification and never changed for
/// a given id within a session; drives which destination board the stage
/// advancer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Transport,
    Service,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Transport => "transport",
            JobType::Service => "service",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher-facing job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Active job with usable coordinates (or no address to resolve)
    Open,
    /// Advanced to its done phase; no longer shown
    Completed,
    /// An address was supplied but did not geocode
    GeocodingError,
}

impl JobStatus {
    /// Derive the status from the geocoding outcome.
    ///
    /// `GeocodingError` holds exactly when an address was supplied and no
    /// coordinates came back. A job with no address at all stays `Open` so
    /// it is visible and correctable rather than flagged as a failure of a
    /// lookup that never ran.
    pub fn derive(coordinates: Option<GeoPoint>, address: &str) -> JobStatus {
        if coordinates.is_none() && !address.trim().is_empty() {
            JobStatus::GeocodingError
        } else {
            JobStatus::Open
        }
    }
}

/// A transport or service job, normalized from CRM data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Stable external identifier, unique within the live list
    pub id: u64,
    /// Machine/equipment description
    pub title: String,
    /// Resolved contact display name, [`UNKNOWN_CLIENT`] when lookup failed
    pub client_name: String,
    /// Free-text address; may be empty
    pub address: String,
    /// Absent when geocoding failed or was never attempted
    pub coordinates: Option<GeoPoint>,
    pub status: JobStatus,
    /// Human-readable workflow stage, [`UNKNOWN_PHASE`] when unresolvable
    pub phase_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Back-reference to the contact record, used only to push address edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<u64>,
    #[serde(rename = "type")]
    pub job_type: JobType,
}

impl Job {
    /// Deep link into the CRM's plan view for this job
    pub fn crm_link(&self, company_domain: &str) -> String {
        format!(
            "https://{}.pipedrive.com/projects/{}/plan",
            company_domain, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_open_when_coordinates_present() {
        let coords = Some(GeoPoint { lat: 52.0, lng: 20.0 });
        assert_eq!(JobStatus::derive(coords, "Mława, Warszawska 1"), JobStatus::Open);
    }

    #[test]
    fn status_error_when_address_but_no_coordinates() {
        assert_eq!(
            JobStatus::derive(None, "Mława, Warszawska 1"),
            JobStatus::GeocodingError
        );
    }

    #[test]
    fn status_open_when_no_address_and_no_coordinates() {
        assert_eq!(JobStatus::derive(None, ""), JobStatus::Open);
        assert_eq!(JobStatus::derive(None, "   "), JobStatus::Open);
    }

    #[test]
    fn job_type_serializes_as_type_field() {
        let job = Job {
            id: 101,
            title: "Kombajn Zbożowy CX8".to_string(),
            client_name: "Jan Kowalski".to_string(),
            address: "ul. Polna 5, Płońsk".to_string(),
            coordinates: None,
            status: JobStatus::GeocodingError,
            phase_name: "Przygotowanie maszyny".to_string(),
            phone: None,
            person_id: Some(1),
            job_type: JobType::Transport,
        };

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "transport");
        assert_eq!(json["status"], "geocoding_error");

        let back: Job = serde_json::from_value(json).unwrap();
        assert_eq!(back.job_type, JobType::Transport);
    }

    #[test]
    fn crm_link_uses_company_domain() {
        let job = Job {
            id: 500,
            title: String::new(),
            client_name: UNKNOWN_CLIENT.to_string(),
            address: String::new(),
            coordinates: None,
            status: JobStatus::Open,
            phase_name: UNKNOWN_PHASE.to_string(),
            phone: None,
            person_id: None,
            job_type: JobType::Service,
        };
        assert_eq!(
            job.crm_link("lupus"),
            "https://lupus.pipedrive.com/projects/500/plan"
        );
    }
}
