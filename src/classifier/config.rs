//! Keyword configuration for board and phase classification
//!
//! Board and phase "types" exist only as human-edited display names in the
//! CRM, so classification is keyword matching by necessity. The keyword
//! sets are configuration, not code: deployments rename their boards
//! without a rebuild.

use serde::{Deserialize, Serialize};

/// Case-insensitive substring match of `name` against any keyword
pub(crate) fn matches_any(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords.iter().any(|k| name.contains(&k.to_lowercase()))
}

/// Keyword sets for one job type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeKeywords {
    /// Substrings identifying this type's board
    pub board_keywords: Vec<String>,
    /// Substrings marking a phase as active/in-progress
    pub active_phase_keywords: Vec<String>,
}

/// Classification keyword configuration, one entry per job type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub transport: TypeKeywords,
    pub service: TypeKeywords,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        // Defaults match the Polish deployment this grew out of, with the
        // English equivalents the board editors also use.
        Self {
            transport: TypeKeywords {
                board_keywords: strings(&["dostarczenie", "delivery", "transport"]),
                active_phase_keywords: strings(&["przygotowanie", "transport", "gotowe"]),
            },
            service: TypeKeywords {
                board_keywords: strings(&["serwis", "service", "naprawy", "warsztat"]),
                active_phase_keywords: strings(&[
                    "usterki",
                    "diagnoza",
                    "rozwiązanie",
                    "termin",
                    "napraw",
                    "zgłoszenie",
                ]),
            },
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ClassifyConfig {
    /// Reject keyword sets that could never classify anything
    pub fn validate(&self) -> Result<(), String> {
        for (label, keywords) in [
            ("transport.board_keywords", &self.transport.board_keywords),
            ("transport.active_phase_keywords", &self.transport.active_phase_keywords),
            ("service.board_keywords", &self.service.board_keywords),
            ("service.active_phase_keywords", &self.service.active_phase_keywords),
        ] {
            if keywords.is_empty() {
                return Err(format!("{label} must not be empty"));
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(format!("{label} contains a blank keyword"));
            }
        }
        Ok(())
    }
}
