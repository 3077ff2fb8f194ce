//! Stage advancement
//!
//! Moves a job to its type-specific "done" phase: locate the destination
//! board by keyword, locate the destination phase on that board by keyword,
//! then issue a single phase update. Any miss fails the operation with no
//! mutation attempted. The advancer never inspects the record's current
//! phase; `active → completed` is the only transition it can express.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::matches_any;
use crate::crm::{CrmApi, CrmError};
use crate::job::JobType;

/// Destination patterns for one job type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRule {
    /// Substrings identifying the destination board
    pub board_keywords: Vec<String>,
    /// Substrings identifying the destination phase on that board
    pub phase_keywords: Vec<String>,
}

/// Destination configuration, one rule per job type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvanceConfig {
    pub transport: TargetRule,
    pub service: TargetRule,
}

impl Default for AdvanceConfig {
    fn default() -> Self {
        Self {
            transport: TargetRule {
                board_keywords: vec!["dostarczenie".to_string(), "delivery".to_string()],
                phase_keywords: vec!["u klienta".to_string()],
            },
            service: TargetRule {
                board_keywords: vec![
                    "serwis".to_string(),
                    "service".to_string(),
                    "naprawy".to_string(),
                ],
                phase_keywords: vec![
                    "wykonanie".to_string(),
                    "zrealizowane".to_string(),
                    "gotowe".to_string(),
                ],
            },
        }
    }
}

impl AdvanceConfig {
    pub fn rule(&self, job_type: JobType) -> &TargetRule {
        match job_type {
            JobType::Transport => &self.transport,
            JobType::Service => &self.service,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (label, keywords) in [
            ("advance.transport.board_keywords", &self.transport.board_keywords),
            ("advance.transport.phase_keywords", &self.transport.phase_keywords),
            ("advance.service.board_keywords", &self.service.board_keywords),
            ("advance.service.phase_keywords", &self.service.phase_keywords),
        ] {
            if keywords.is_empty() {
                return Err(format!("{label} must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    #[error("no destination board matched for {0} jobs")]
    BoardNotFound(JobType),

    #[error("no destination phase matched on board '{board}' for {job_type} jobs")]
    PhaseNotFound { board: String, job_type: JobType },

    #[error(transparent)]
    Crm(#[from] CrmError),
}

/// Performs the one-way `active → completed` transition
pub struct StageAdvancer {
    config: AdvanceConfig,
}

impl StageAdvancer {
    pub fn new(config: AdvanceConfig) -> Self {
        Self { config }
    }

    pub async fn advance<C: CrmApi>(
        &self,
        crm: &C,
        record_id: u64,
        job_type: JobType,
    ) -> Result<(), AdvanceError> {
        let rule = self.config.rule(job_type);

        let boards = crm.list_boards().await?;
        let board = boards
            .iter()
            .find(|b| matches_any(&b.name, &rule.board_keywords))
            .ok_or(AdvanceError::BoardNotFound(job_type))?;

        let phases = crm.list_phases(board.id).await?;
        let phase = phases
            .iter()
            .find(|p| matches_any(&p.name, &rule.phase_keywords))
            .ok_or_else(|| AdvanceError::PhaseNotFound {
                board: board.name.clone(),
                job_type,
            })?;

        info!(
            record_id,
            board = %board.name,
            phase = %phase.name,
            %job_type,
            "advancing record to destination phase"
        );

        crm.update_record_phase(record_id, phase.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AdvanceConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_rule_is_rejected() {
        let mut config = AdvanceConfig::default();
        config.service.phase_keywords.clear();
        let err = config.validate().unwrap_err();
        assert!(err.contains("service.phase_keywords"));
    }

    #[test]
    fn rule_selects_by_job_type() {
        let config = AdvanceConfig::default();
        assert!(config
            .rule(JobType::Transport)
            .phase_keywords
            .contains(&"u klienta".to_string()));
        assert!(config
            .rule(JobType::Service)
            .phase_keywords
            .contains(&"wykonanie".to_string()));
    }

    #[test]
    fn parses_from_toml_section() {
        let toml = r#"
            [transport]
            board_keywords = ["delivery"]
            phase_keywords = ["at client"]
        "#;

        let config: AdvanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.transport.phase_keywords, vec!["at client"]);
        // Missing section falls back to defaults
        assert!(!config.service.board_keywords.is_empty());
    }
}
