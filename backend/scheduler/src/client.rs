use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use courier_core::{CourierError, HistoryEntry, Submitter};

use crate::history::HistoryLog;

/// Default outbound request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts appointment payloads to the clinic server and records every call.
pub struct NetworkClient {
    client: Client,
    endpoint: String,
    history: Arc<HistoryLog>,
}

impl NetworkClient {
    pub fn new(endpoint: impl Into<String>, history: Arc<HistoryLog>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT, history)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
        history: Arc<HistoryLog>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            history,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, payload: &str) -> Result<(u16, String), CourierError> {
        debug!(endpoint = %self.endpoint, "Posting appointment");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| CourierError::Transport(e.to_string()))?;

        let code = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CourierError::Server(format!("failed to read response body: {e}")))?;
        Ok((code, body))
    }

    async fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.history.append(&entry).await {
            warn!(error = %e, "Failed to append history entry");
        }
    }
}

#[async_trait]
impl Submitter for NetworkClient {
    /// `"Status: <code>\n<body>"` on a response, `"Error: <message>"` otherwise.
    async fn send(&self, payload: &str) -> Result<String> {
        match self.post(payload).await {
            Ok((code, body)) => {
                let result = format!("Status: {code}\n{body}");
                self.record(HistoryEntry::response(code, body, payload)).await;
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Appointment post failed");
                self.record(HistoryEntry::error(message.clone(), payload)).await;
                Ok(format!("Error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route(
                "/Appointment/Save",
                post(|body: String| async move {
                    if body.contains("PatientName") {
                        (StatusCode::OK, "Saved".to_string())
                    } else {
                        (StatusCode::BAD_REQUEST, "Error: missing patient".to_string())
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/Appointment/Save")
    }

    async fn closed_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/Appointment/Save")
    }

    #[tokio::test]
    async fn response_is_formatted_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryLog::in_dir(dir.path()));
        let client = NetworkClient::new(spawn_server().await, history.clone()).unwrap();

        let result = client.send(r#"{"PatientName":"Rahima"}"#).await.unwrap();
        assert_eq!(result, "Status: 200\nSaved");

        let records = history.read().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "200");
        assert_eq!(records[0].response_body, "Saved");
        assert_eq!(records[0].raw_payload, r#"{"PatientName":"Rahima"}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_still_a_status_result() {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryLog::in_dir(dir.path()));
        let client = NetworkClient::new(spawn_server().await, history.clone()).unwrap();

        let result = client.send("{}").await.unwrap();
        assert_eq!(result, "Status: 400\nError: missing patient");
        assert_eq!(crate::retry::classify(&result), crate::retry::Classification::Success);
        assert_eq!(history.read().await[0].status, "400");
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_string_and_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryLog::in_dir(dir.path()));
        let client = NetworkClient::new(closed_endpoint().await, history.clone()).unwrap();

        let result = client.send("{}").await.unwrap();
        assert!(result.starts_with("Error: "), "unexpected result: {result}");

        let records = history.read().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].is_error());
        assert!(!records[0].response_body.is_empty());
    }

    #[tokio::test]
    async fn history_failure_does_not_change_the_result() {
        let dir = tempfile::tempdir().unwrap();
        // the history path is a directory, so every append fails
        let history = Arc::new(HistoryLog::new(dir.path()));
        let client = NetworkClient::new(spawn_server().await, history).unwrap();

        let result = client.send(r#"{"PatientName":"Rahima"}"#).await.unwrap();
        assert_eq!(result, "Status: 200\nSaved");
    }
}
