// ABOUTME: Rate-limited HTTP JSON client built on reqwest.
// ABOUTME: Routes every request through a Scheduler and feeds back rate-limit headers.

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::scheduler::Scheduler;

/// HTTP client whose every call is admitted by a [`Scheduler`].
///
/// Response headers are passed to [`Scheduler::observe`] as soon as each call
/// completes, before the status is checked, so rejected calls still retune
/// the scheduler.
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    scheduler: Scheduler,
    bearer_token: Option<String>,
}

impl RateLimitedClient {
    /// Create a client gated by `scheduler`.
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            http: reqwest::Client::new(),
            scheduler,
            bearer_token: None,
        }
    }

    /// Use a preconfigured reqwest client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The scheduler gating this client.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T>(&self, url: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let http = self.http.clone();
        let scheduler = self.scheduler.clone();
        let token = self.bearer_token.clone();
        let url = url.to_string();

        self.scheduler
            .submit(move || async move {
                let mut request = http.get(&url).header(CONTENT_TYPE, "application/json");
                if let Some(token) = token {
                    request = request.bearer_auth(token);
                }

                let response = request.send().await?;
                scheduler.observe(response.headers());

                let status = response.status();
                if !status.is_success() {
                    // Drain the body so the connection can be reused.
                    let message = response.text().await.unwrap_or_default();
                    tracing::debug!(%url, status = status.as_u16(), "API call rejected");
                    return Err(ClientError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }

                let body = response.bytes().await?;
                Ok::<T, ClientError>(serde_json::from_slice(&body)?)
            })
            .await?
    }
}
