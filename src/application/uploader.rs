//! SignalFx Uploader - Main application use case
//!
//! Buffers aggregated samples, decides when to flush, and pushes each batch
//! to the ingest API with a single retry. Delivery problems never abort the
//! test being measured: a batch that fails twice is logged and dropped.

use crate::adapters::outbound::{SessionConfig, SignalfxSession, SystemBrowser};
use crate::application::KpiBuffer;
use crate::config::Settings;
use crate::domain::entities::{DataPoint, TimeRange};
use crate::domain::ports::{AggregatorListener, IngestClient, LinkOpener, Reporter, ResultsProvider};
use crate::domain::services::{resolve_token, DatapointSerializer, TOKEN_ENV_VAR};
use crate::domain::value_objects::{Dimensions, SessionId};
use crate::error::UploadError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// How a flush ended. Every variant leaves the buffer empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Accepted on the first attempt
    Delivered,
    /// Accepted on the retry
    Recovered,
    /// Both attempts failed; the batch is gone
    Dropped,
}

/// Reporter that streams test KPIs to SignalFx.
pub struct SignalfxUploader {
    settings: Settings,
    serializer: DatapointSerializer,
    buffer: KpiBuffer,
    client: Option<Arc<dyn IngestClient>>,
    opener: Arc<dyn LinkOpener>,
    session_id: SessionId,
    env_token: Option<String>,
    tags: Dimensions,
    last_dispatch: Option<Instant>,
    time_range: TimeRange,
}

impl SignalfxUploader {
    /// Create an uploader; nothing touches the network until `prepare`.
    pub fn new(settings: Settings) -> Self {
        let settings = settings.normalized();
        Self {
            serializer: DatapointSerializer::new(settings.report_times_multiplier),
            settings,
            buffer: KpiBuffer::new(),
            client: None,
            opener: Arc::new(SystemBrowser::new()),
            session_id: SessionId::generate(),
            env_token: std::env::var(TOKEN_ENV_VAR).ok(),
            tags: Dimensions::new(),
            last_dispatch: None,
            time_range: TimeRange::default(),
        }
    }

    /// Use this client instead of building a SignalFx session in `prepare`.
    pub fn with_client(mut self, client: Arc<dyn IngestClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_link_opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Override the token normally read from `SIGNALFX_TOKEN`.
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        self.env_token = token;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Base dimensions shared by every record of this run.
    pub fn tags(&self) -> &Dimensions {
        &self.tags
    }

    /// Handle to the pending samples.
    pub fn buffer(&self) -> KpiBuffer {
        self.buffer.clone()
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Dashboard link filtered to this project and run.
    pub fn results_url(&self) -> String {
        format!(
            "{}?startTime=-15m&endTime=Now&sources%5B%5D=project:{}&sources%5B%5D=uuid:{}&density=4",
            self.settings.dashboard_url, self.settings.project, self.session_id
        )
    }

    /// Periodic tick at an explicit instant.
    ///
    /// Flushes when the send interval has elapsed since the last dispatch
    /// and samples are waiting. The dispatch time moves before sending so a
    /// slow backend does not cause back-to-back attempts.
    pub async fn check_at(&mut self, now: Instant) -> Result<bool, UploadError> {
        tracing::debug!("KPI bulk buffer len: {}", self.buffer.len());

        let due = self
            .last_dispatch
            .map_or(true, |last| now.saturating_duration_since(last) >= self.settings.send_interval);

        if due {
            self.last_dispatch = Some(now);
            if !self.buffer.is_empty() {
                self.flush(false).await?;
            }
        }

        Ok(false)
    }

    /// Serialize and send everything buffered, retrying once.
    ///
    /// The buffer is emptied up front whatever the outcome. Errors other
    /// than network or transient I/O faults propagate.
    pub async fn flush(&mut self, is_final: bool) -> Result<FlushOutcome, UploadError> {
        let client = self.client()?;
        let data = self.buffer.take();

        let body = self
            .serializer
            .encode(&data, &self.tags, is_final, &mut self.time_range)?;

        let first = match client.send_kpi_data(body.clone()).await {
            Ok(()) => return Ok(FlushOutcome::Delivered),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        let backoff = client.timeout();
        tracing::debug!("error sending data: {:?}", first);
        tracing::warn!("failed to send data, will retry in {:?}...", backoff);
        tokio::time::sleep(backoff).await;

        match client.send_kpi_data(body).await {
            Ok(()) => {
                tracing::info!("succeeded with retry");
                Ok(FlushOutcome::Recovered)
            }
            Err(e) if e.is_retryable() => {
                tracing::error!("fatal error sending data: {}", e);
                tracing::warn!("will skip failed data ({} samples) and continue running", data.len());
                Ok(FlushOutcome::Dropped)
            }
            Err(e) => Err(e),
        }
    }

    fn client(&self) -> Result<Arc<dyn IngestClient>, UploadError> {
        self.client
            .clone()
            .ok_or_else(|| UploadError::Internal("uploader used before prepare".to_string()))
    }

    fn open_link(&self, url: &str) {
        if let Err(e) = self.opener.open(url) {
            tracing::warn!("failed to open browser: {}", e);
        }
    }
}

#[async_trait]
impl Reporter for SignalfxUploader {
    async fn prepare(&mut self, aggregator: Option<&mut dyn ResultsProvider>) -> Result<(), UploadError> {
        let (token, source) = resolve_token(
            self.settings.token.as_deref(),
            self.env_token.as_deref(),
            self.settings.token_file.as_deref(),
        )
        .ok_or_else(|| UploadError::Config("no SignalFx API key provided".to_string()))?;
        tracing::debug!("using API token from {:?}", source);

        self.tags = Dimensions::new();
        self.tags.insert("project", self.settings.project.as_str());
        self.tags.insert("uuid", self.session_id.as_str());
        self.tags.extend(self.settings.custom_tags.clone());

        if self.client.is_none() {
            let session = SignalfxSession::new(SessionConfig {
                address: self.settings.address.clone(),
                data_address: self.settings.data_address.clone(),
                token: Some(token),
                timeout: self.settings.timeout,
                ..SessionConfig::default()
            })?;
            self.client = Some(Arc::new(session));
        }

        let client = self.client()?;
        if let Err(e) = client.ping().await {
            tracing::error!("cannot reach SignalFx API, maybe the address/token is wrong");
            return Err(UploadError::Connectivity {
                address: self.settings.address.clone(),
                source: Box::new(e),
            });
        }

        if let Some(aggregator) = aggregator {
            aggregator.add_listener(Arc::new(self.buffer.clone()));
        }

        tracing::info!(
            "SignalFx uploader ready, project={} session={}",
            self.settings.project,
            self.session_id
        );
        Ok(())
    }

    async fn startup(&mut self) -> Result<(), UploadError> {
        let url = self.results_url();
        tracing::info!("started data feeding: {}", url);
        if self.settings.browser_open.at_start() {
            self.open_link(&url);
        }
        Ok(())
    }

    async fn check(&mut self) -> Result<bool, UploadError> {
        self.check_at(Instant::now()).await
    }

    async fn post_process(&mut self) -> Result<(), UploadError> {
        tracing::debug!("KPI bulk buffer len in post-proc: {}", self.buffer.len());
        tracing::info!("sending remaining KPI data to server...");
        self.flush(true).await?;

        let url = self.results_url();
        if self.settings.browser_open.at_end() {
            self.open_link(&url);
        }
        tracing::info!("report link: {}", url);
        Ok(())
    }
}

impl AggregatorListener for SignalfxUploader {
    fn aggregated_second(&self, data: DataPoint) {
        self.buffer.push(data);
    }
}
