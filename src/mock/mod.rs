//! Mock CRM and geocoder backends
//!
//! In-memory implementations of the external service seams, seeded with a
//! small fixture set. Used by the `--mock` CLI flag and by the integration
//! tests. Failure injection covers the error paths the live services can
//! take.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::crm::types::{PhoneEntry, RawBoard, RawContact, RawPhase, RawRecord, Relation};
use crate::crm::{CrmApi, CrmError};
use crate::geocode::{GeoError, GeoFetch};
use crate::job::GeoPoint;

/// CRM operations addressable by the failure injector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrmOp {
    ListBoards,
    ListPhases,
    ListRecords,
    GetContact,
    UpdateContactAddress,
    UpdateRecordPhase,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub message: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_count: None,
        }
    }

    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Per-operation failure injector
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<CrmOp, FailureConfig>,
    call_counts: HashMap<CrmOp, u32>,
}

impl FailureInjector {
    pub fn inject(&mut self, op: CrmOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    pub fn clear_op(&mut self, op: CrmOp) {
        self.configs.remove(&op);
        self.call_counts.remove(&op);
    }

    /// Returns the error to raise for this call, if the operation should
    /// fail
    pub fn check(&mut self, op: CrmOp) -> Option<CrmError> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }

        Some(CrmError::Api(config.message.clone()))
    }
}

#[derive(Debug, Default)]
struct MockState {
    boards: Vec<RawBoard>,
    phases: HashMap<u64, Vec<RawPhase>>,
    records: Vec<RawRecord>,
    contacts: HashMap<u64, RawContact>,
    injector: FailureInjector,
    phase_updates: Vec<(u64, u64)>,
    address_updates: Vec<(u64, String)>,
}

/// In-memory CRM
pub struct MockCrm {
    state: Mutex<MockState>,
}

impl MockCrm {
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_data(
        boards: Vec<RawBoard>,
        phases: HashMap<u64, Vec<RawPhase>>,
        records: Vec<RawRecord>,
        contacts: HashMap<u64, RawContact>,
    ) -> Self {
        Self {
            state: Mutex::new(MockState {
                boards,
                phases,
                records,
                contacts,
                ..MockState::default()
            }),
        }
    }

    /// Fixture mirroring a small live deployment: a delivery board and a
    /// service board, three open records, contacts with Polish addresses
    pub fn seeded() -> Self {
        let boards = vec![
            RawBoard { id: 1, name: "Dostarczenie maszyny".to_string() },
            RawBoard { id: 2, name: "Serwis".to_string() },
        ];

        let mut phases = HashMap::new();
        phases.insert(
            1,
            vec![
                RawPhase { id: 10, name: "Przygotowanie maszyny".to_string() },
                RawPhase { id: 11, name: "Transport LUPUS lub inny".to_string() },
                RawPhase { id: 12, name: "Maszyna u klienta".to_string() },
            ],
        );
        phases.insert(
            2,
            vec![
                RawPhase { id: 20, name: "Zgłoszenie usterki".to_string() },
                RawPhase { id: 21, name: "Diagnoza".to_string() },
                RawPhase { id: 22, name: "Wykonanie".to_string() },
            ],
        );

        let records = vec![
            RawRecord {
                id: 101,
                title: "Kombajn Zbożowy CX8".to_string(),
                phase_id: 10,
                person_id: Some(Relation::Id(1)),
            },
            RawRecord {
                id: 102,
                title: "Siewnik Precyzyjny 4m".to_string(),
                phase_id: 11,
                person_id: Some(Relation::Object {
                    value: 2,
                    name: Some("Adam Nowak".to_string()),
                }),
            },
            RawRecord {
                id: 103,
                title: "Naprawa gwarancyjna talerzówki".to_string(),
                phase_id: 20,
                person_id: Some(Relation::Id(3)),
            },
        ];

        let mut contacts = HashMap::new();
        contacts.insert(1, contact(1, "Jan Kowalski", "ul. Polna 5, Płońsk", "500-100-100"));
        contacts.insert(2, contact(2, "Adam Nowak", "Szamotuły, Dworcowa 10", "600-200-200"));
        contacts.insert(3, contact(3, "Piotr Zieliński", "Mława, Warszawska 1", "700-300-300"));

        Self::with_data(boards, phases, records, contacts)
    }

    pub fn inject_failure(&self, op: CrmOp, config: FailureConfig) {
        self.lock().injector.inject(op, config);
    }

    pub fn inject_error(&self, op: CrmOp, message: impl Into<String>) {
        self.inject_failure(op, FailureConfig::error(message));
    }

    pub fn clear_failure(&self, op: CrmOp) {
        self.lock().injector.clear_op(op);
    }

    /// Phase updates applied so far, as (record_id, phase_id)
    pub fn phase_updates(&self) -> Vec<(u64, u64)> {
        self.lock().phase_updates.clone()
    }

    /// Address updates applied so far, as (contact_id, address)
    pub fn address_updates(&self) -> Vec<(u64, String)> {
        self.lock().address_updates.clone()
    }

    /// Drop the phases of one board, e.g. to make a destination phase
    /// unfindable
    pub fn remove_phases(&self, board_id: u64) {
        self.lock().phases.remove(&board_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn contact(id: u64, name: &str, postal_address: &str, phone: &str) -> RawContact {
    RawContact {
        id,
        name: name.to_string(),
        phone: vec![PhoneEntry {
            value: phone.to_string(),
        }],
        org_id: None,
        postal_address: Some(postal_address.to_string()),
        extra: serde_json::Map::new(),
    }
}

#[async_trait]
impl CrmApi for MockCrm {
    async fn list_boards(&self) -> Result<Vec<RawBoard>, CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::ListBoards) {
            return Err(err);
        }
        Ok(state.boards.clone())
    }

    async fn list_phases(&self, board_id: u64) -> Result<Vec<RawPhase>, CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::ListPhases) {
            return Err(err);
        }
        Ok(state.phases.get(&board_id).cloned().unwrap_or_default())
    }

    async fn list_open_records(&self, limit: u32) -> Result<Vec<RawRecord>, CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::ListRecords) {
            return Err(err);
        }
        Ok(state.records.iter().take(limit as usize).cloned().collect())
    }

    async fn get_contact(&self, id: u64) -> Result<RawContact, CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::GetContact) {
            return Err(err);
        }
        state
            .contacts
            .get(&id)
            .cloned()
            .ok_or_else(|| CrmError::Api(format!("contact {id} not found")))
    }

    async fn update_contact_address(&self, id: u64, address: &str) -> Result<(), CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::UpdateContactAddress) {
            return Err(err);
        }
        if let Some(contact) = state.contacts.get_mut(&id) {
            contact.postal_address = Some(address.to_string());
        }
        state.address_updates.push((id, address.to_string()));
        Ok(())
    }

    async fn update_record_phase(&self, record_id: u64, phase_id: u64) -> Result<(), CrmError> {
        let mut state = self.lock();
        if let Some(err) = state.injector.check(CrmOp::UpdateRecordPhase) {
            return Err(err);
        }
        if let Some(record) = state.records.iter_mut().find(|r| r.id == record_id) {
            record.phase_id = phase_id;
        }
        state.phase_updates.push((record_id, phase_id));
        Ok(())
    }
}

/// Table-driven geocoder with a network-call counter
pub struct MockGeoFetch {
    table: Mutex<HashMap<String, GeoPoint>>,
    calls: AtomicU32,
    fail: Mutex<bool>,
}

impl Default for MockGeoFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGeoFetch {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
            fail: Mutex::new(false),
        }
    }

    /// Table covering the seeded fixture addresses
    pub fn seeded() -> Self {
        let fetch = Self::new();
        fetch.insert("ul. Polna 5, Płońsk", GeoPoint { lat: 52.6226, lng: 20.3751 });
        fetch.insert("Szamotuły, Dworcowa 10", GeoPoint { lat: 52.6114, lng: 16.5816 });
        fetch.insert("Mława, Warszawska 1", GeoPoint { lat: 53.1128, lng: 20.3849 });
        fetch
    }

    pub fn insert(&self, address: &str, point: GeoPoint) {
        self.table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.to_string(), point);
    }

    /// Make every subsequent fetch fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }

    /// Number of fetches that reached the "network"
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoFetch for MockGeoFetch {
    async fn fetch(&self, address: &str) -> Result<Option<GeoPoint>, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(GeoError::Transport("injected failure".to_string()));
        }
        Ok(self
            .table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_fixture_is_consistent() {
        let crm = MockCrm::seeded();
        let boards = crm.list_boards().await.unwrap();
        assert_eq!(boards.len(), 2);

        let records = crm.list_open_records(500).await.unwrap();
        assert_eq!(records.len(), 3);

        for record in &records {
            let contact_id = record.contact_id().unwrap();
            let contact = crm.get_contact(contact_id).await.unwrap();
            assert!(contact.best_address(None).is_some());
        }
    }

    #[tokio::test]
    async fn injector_fails_then_recovers() {
        let crm = MockCrm::seeded();
        crm.inject_failure(
            CrmOp::ListBoards,
            FailureConfig::error("boards down").with_fail_count(2),
        );

        assert!(crm.list_boards().await.is_err());
        assert!(crm.list_boards().await.is_err());
        assert!(crm.list_boards().await.is_ok());
    }

    #[tokio::test]
    async fn record_limit_is_respected() {
        let crm = MockCrm::seeded();
        let records = crm.list_open_records(2).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn phase_update_mutates_record() {
        let crm = MockCrm::seeded();
        crm.update_record_phase(101, 12).await.unwrap();
        assert_eq!(crm.phase_updates(), vec![(101, 12)]);

        let records = crm.list_open_records(500).await.unwrap();
        let record = records.iter().find(|r| r.id == 101).unwrap();
        assert_eq!(record.phase_id, 12);
    }

    #[tokio::test]
    async fn geo_fetch_counts_calls() {
        let fetch = MockGeoFetch::seeded();
        assert!(fetch.fetch("Mława, Warszawska 1").await.unwrap().is_some());
        assert!(fetch.fetch("nowhere").await.unwrap().is_none());
        assert_eq!(fetch.calls(), 2);
    }
}
