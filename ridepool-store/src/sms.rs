use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use ridepool_core::notify::SmsNotifier;

/// HTTP adapter for the NOC messaging service.
///
/// Sending is fire-and-forget: a delivery failure is logged and never
/// propagated to the caller. Destination validation fails open: if the
/// NOC is unreachable the number is treated as valid so registration is
/// not blocked by gateway downtime.
pub struct NocSmsGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    valid: bool,
}

impl NocSmsGateway {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl SmsNotifier for NocSmsGateway {
    async fn send_message(&self, destination: &str, body: &str) {
        let url = format!("{}/sms", self.base_url);
        let payload = json!({
            "e164": destination,
            "content": body,
        });

        match self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(destination = %destination, "sms dispatched via NOC");
            }
            Ok(resp) => {
                warn!(destination = %destination, status = %resp.status(), "NOC rejected sms");
            }
            Err(e) => {
                warn!(destination = %destination, error = %e, "failed to reach NOC for sms");
            }
        }
    }

    async fn validate_destination(&self, identifier: &str) -> bool {
        let url = format!(
            "{}/phone-numbers/{}/validations",
            self.base_url, identifier
        );

        let resp = match self.http.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // Fail open: do not block signup on gateway downtime.
                warn!(error = %e, "NOC validation unreachable, treating number as valid");
                return true;
            }
        };

        match resp.json::<ValidationResponse>().await {
            Ok(result) => result.valid,
            Err(e) => {
                warn!(error = %e, "unreadable NOC validation response");
                false
            }
        }
    }
}
