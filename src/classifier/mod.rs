//! Workflow-board classification
//!
//! Determines which board is the transport board and which is the service
//! board, which of their phases count as active, and therefore which raw
//! records are transport jobs, service jobs, or excluded entirely.

use std::collections::{HashMap, HashSet};

use crate::crm::types::{RawBoard, RawPhase};
use crate::job::{JobType, UNKNOWN_PHASE};

pub mod config;

pub use config::{ClassifyConfig, TypeKeywords};

pub(crate) use config::matches_any;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Neither board matched: nothing could be typed, so no partial job
    /// list is possible
    #[error("no transport or service board matched the configured keywords")]
    NoMatchingBoards,
}

/// Which boards carry each job type. At most one board per type; the first
/// match wins when several board names match.
#[derive(Debug, Clone)]
pub struct BoardResolution {
    pub transport: Option<RawBoard>,
    pub service: Option<RawBoard>,
}

impl BoardResolution {
    pub fn resolve(boards: &[RawBoard], config: &ClassifyConfig) -> Result<Self, ClassifyError> {
        let transport = boards
            .iter()
            .find(|b| matches_any(&b.name, &config.transport.board_keywords))
            .cloned();
        let service = boards
            .iter()
            .find(|b| matches_any(&b.name, &config.service.board_keywords))
            .cloned();

        if transport.is_none() && service.is_none() {
            return Err(ClassifyError::NoMatchingBoards);
        }

        Ok(Self { transport, service })
    }
}

/// Phase lookup built from the phases of the resolved boards during a
/// single fetch: id → display name, plus the per-type active-phase sets.
#[derive(Debug, Default, Clone)]
pub struct PhaseIndex {
    names: HashMap<u64, String>,
    transport_active: HashSet<u64>,
    service_active: HashSet<u64>,
}

impl PhaseIndex {
    pub fn build(
        transport_phases: &[RawPhase],
        service_phases: &[RawPhase],
        config: &ClassifyConfig,
    ) -> Self {
        let mut index = PhaseIndex::default();

        for phase in transport_phases {
            index.names.insert(phase.id, phase.name.clone());
            if matches_any(&phase.name, &config.transport.active_phase_keywords) {
                index.transport_active.insert(phase.id);
            }
        }
        for phase in service_phases {
            index.names.insert(phase.id, phase.name.clone());
            if matches_any(&phase.name, &config.service.active_phase_keywords) {
                index.service_active.insert(phase.id);
            }
        }

        index
    }

    /// Classify a record by its phase id. Transport is checked first;
    /// phase ids are board-scoped so an id cannot genuinely satisfy both.
    /// `None` means the record is excluded from the result.
    pub fn classify(&self, phase_id: u64) -> Option<JobType> {
        if self.transport_active.contains(&phase_id) {
            Some(JobType::Transport)
        } else if self.service_active.contains(&phase_id) {
            Some(JobType::Service)
        } else {
            None
        }
    }

    /// Display name for a phase id, with the sentinel fallback for ids not
    /// seen during this fetch
    pub fn phase_name(&self, phase_id: u64) -> String {
        self.names
            .get(&phase_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PHASE.to_string())
    }

    pub fn active_count(&self) -> (usize, usize) {
        (self.transport_active.len(), self.service_active.len())
    }
}
