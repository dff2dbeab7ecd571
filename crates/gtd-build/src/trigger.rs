use gtd_exec::CommandExecutor;
use reqwest::StatusCode;

use crate::builder::Builder;
use crate::error::{BuildError, Result};

impl<E: CommandExecutor> Builder<E> {
    /// GET each HTTP(S) trigger URI in order, stopping at the first non-200.
    pub async fn push_trigger(&self) -> Result<()> {
        let opts = self.resolve().await?;

        for uri in http_triggers(&opts.trigger_uris) {
            let response = self
                .http
                .get(uri)
                .send()
                .await
                .map_err(|e| BuildError::TriggerRequest {
                    uri: uri.to_owned(),
                    source: e,
                })?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| BuildError::TriggerRequest {
                    uri: uri.to_owned(),
                    source: e,
                })?;

            if status != StatusCode::OK {
                return Err(BuildError::TriggerStatus {
                    uri: uri.to_owned(),
                    status: status.as_u16(),
                    body,
                });
            }

            tracing::info!(uri = %uri, "trigger pushed");
            tracing::debug!(uri = %uri, body = %body, "trigger response");
        }
        Ok(())
    }
}

/// Keep only URIs with an `http://` or `https://` scheme.
fn http_triggers(uris: &[String]) -> Vec<&str> {
    uris.iter()
        .map(String::as_str)
        .filter(|uri| {
            let supported = uri.starts_with("http://") || uri.starts_with("https://");
            if !supported {
                tracing::warn!(uri = %uri, "skipping trigger with unsupported scheme");
            }
            supported
        })
        .collect()
}
