//! Client for the C2 command-and-control REST API.
//!
//! Every request carries a bearer token, a request timeout and a connect
//! timeout. Timeouts, connection failures, HTTP 429 and 5xx responses are
//! retried with exponential backoff; other failures are returned at once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use rtdata_common::time::format_api_time;
use rtdata_common::C2Config;
use tracing::{debug, instrument, warn};

use crate::error::{PlatformError, PlatformResult};
use crate::positions::{parse_positions, PlatformPositions};

const POSITIONS_PATH: &str = "/positions/positions";
const OBSERVATIONS_PATH: &str = "/timeseries/observations/csv";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Glider platform type in C2.
pub const SLOCUM: &str = "slocum";

pub struct C2Client {
    client: Client,
    base_url: String,
    token: String,
    max_retries: u32,
    initial_retry_delay: Duration,
}

impl C2Client {
    pub fn new(config: &C2Config) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.environment.base_url().to_string(),
            token: config.token.clone(),
            max_retries: config.max_retries,
            initial_retry_delay: Duration::from_secs(1),
        })
    }

    /// Point the client at another server, e.g. a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Positions of one platform since `from`, newest first.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn get_positions(
        &self,
        platform_type: &str,
        platform_serial: &str,
        from: &DateTime<Utc>,
    ) -> PlatformResult<PlatformPositions> {
        let query = vec![
            ("platform_type", platform_type.to_string()),
            ("platform_serial", platform_serial.to_string()),
            ("from", format_api_time(from)),
            ("time_order", "descending".to_string()),
        ];
        let body = self.get_with_retry(POSITIONS_PATH, &query).await?;
        let positions = parse_positions(&body)?;
        debug!(
            fixes = positions.positions.internal.len(),
            "Fetched positions"
        );
        Ok(positions)
    }

    /// Observation time series as the raw long-format CSV body.
    #[instrument(skip(self, variables), fields(base = %self.base_url, variables = variables.len()))]
    pub async fn get_observations(
        &self,
        platform_type: &str,
        platform_serial: &str,
        from: &DateTime<Utc>,
        variables: &[String],
    ) -> PlatformResult<String> {
        let mut query = vec![
            ("platform_type", platform_type.to_string()),
            ("platform_serial", platform_serial.to_string()),
            ("from", format_api_time(from)),
        ];
        query.extend(variables.iter().map(|v| ("variable", v.clone())));
        let body = self.get_with_retry(OBSERVATIONS_PATH, &query).await?;
        debug!(bytes = body.len(), "Fetched observations");
        Ok(body)
    }

    async fn get_with_retry(&self, path: &str, query: &[(&str, String)]) -> PlatformResult<String> {
        let mut retry_count = 0;
        let mut delay = self.initial_retry_delay;

        loop {
            match self.get_once(path, query).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "C2 request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, MAX_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, path: &str, query: &[(&str, String)]) -> PlatformResult<String> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
