//! Best-effort driver advisory text
//!
//! Wraps an opaque generative text service: given a job summary, return a
//! short note for the driver. Failure never propagates; every error path
//! degrades to a canned user-facing fallback string.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::job::Job;

/// Shown when no endpoint or API key is configured
pub const FALLBACK_NOT_CONFIGURED: &str =
    "Advisory service is not configured: set advice.endpoint and the API key variable.";

/// Shown on any transport or service failure
pub const FALLBACK_UNAVAILABLE: &str =
    "Advisory service is unavailable right now; plan the route manually.";

fn default_api_key_env() -> String {
    "FLEETMAP_ADVICE_KEY".to_string()
}

/// Advisory service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Generation endpoint; advisory is disabled when unset
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_secs: 10,
        }
    }
}

#[derive(Serialize)]
struct AdviceRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct AdviceResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Prompt handed to the text service for one job
pub fn driver_briefing_prompt(job: &Job) -> String {
    format!(
        "You are a logistics assistant for an agricultural machinery dealer.\n\
         You are analyzing a {} job:\n\
         Machine: {}\n\
         Client: {}\n\
         Address: {}\n\n\
         Write a short, professional note for the driver (3 sentences max).\n\
         Mention special transport needs if the machine name implies them\n\
         (e.g. a low-loader trailer), and add one tip for reaching rural\n\
         addresses in Poland.",
        job.job_type, job.title, job.client_name, job.address
    )
}

/// Generate advisory text for a job. Never fails: missing configuration,
/// transport errors and empty responses all yield a fallback string.
pub async fn generate(config: &AdviceConfig, job: &Job) -> String {
    let Some(endpoint) = config.endpoint.as_deref() else {
        return FALLBACK_NOT_CONFIGURED.to_string();
    };
    let Ok(api_key) = std::env::var(&config.api_key_env) else {
        return FALLBACK_NOT_CONFIGURED.to_string();
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build advisory HTTP client");
            return FALLBACK_UNAVAILABLE.to_string();
        }
    };

    let prompt = driver_briefing_prompt(job);
    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&AdviceRequest { prompt: &prompt })
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => match resp.json::<AdviceResponse>().await {
            Ok(AdviceResponse { text: Some(text) }) if !text.trim().is_empty() => text,
            _ => FALLBACK_UNAVAILABLE.to_string(),
        },
        Ok(resp) => {
            warn!(status = %resp.status(), "advisory service rejected the request");
            FALLBACK_UNAVAILABLE.to_string()
        }
        Err(e) => {
            warn!(error = %e, "advisory service unreachable");
            FALLBACK_UNAVAILABLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, JobType};

    fn job() -> Job {
        Job {
            id: 101,
            title: "Kombajn Zbożowy CX8".to_string(),
            client_name: "Jan Kowalski".to_string(),
            address: "ul. Polna 5, Płońsk".to_string(),
            coordinates: None,
            status: JobStatus::Open,
            phase_name: "Przygotowanie maszyny".to_string(),
            phone: None,
            person_id: Some(1),
            job_type: JobType::Transport,
        }
    }

    #[test]
    fn prompt_carries_job_summary() {
        let prompt = driver_briefing_prompt(&job());
        assert!(prompt.contains("Kombajn Zbożowy CX8"));
        assert!(prompt.contains("Jan Kowalski"));
        assert!(prompt.contains("ul. Polna 5, Płońsk"));
        assert!(prompt.contains("transport job"));
    }

    #[tokio::test]
    async fn missing_endpoint_yields_fallback() {
        let config = AdviceConfig::default();
        assert_eq!(generate(&config, &job()).await, FALLBACK_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn missing_key_yields_fallback() {
        let config = AdviceConfig {
            endpoint: Some("http://localhost:1/advice".to_string()),
            api_key_env: "FLEETMAP_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            timeout_secs: 1,
        };
        assert_eq!(generate(&config, &job()).await, FALLBACK_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_fallback() {
        let config = AdviceConfig {
            endpoint: Some("http://127.0.0.1:1/advice".to_string()),
            api_key_env: "FLEETMAP_TEST_ADVICE_KEY".to_string(),
            timeout_secs: 1,
        };
        std::env::set_var("FLEETMAP_TEST_ADVICE_KEY", "test-key");
        assert_eq!(generate(&config, &job()).await, FALLBACK_UNAVAILABLE);
    }
}
