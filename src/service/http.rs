use super::wire::{self, RouteRequestBody};
use super::RouteService;
use crate::error::{ErrorPayload, SessionError};
use crate::model::{RouteRequest, RouteResponse, SessionConfig};
use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, warn};

const ROUTES_PATH: &str = "/api/routes";
const RESET_CACHE_PATH: &str = "/api/routes/reset-cache";
const GPX_PATH: &str = "/api/routes/gpx";

/// Route service reached over HTTP with reqwest.
#[derive(Debug, Clone)]
pub(crate) struct HttpRouteService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRouteService {
    pub fn new(cfg: &SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build route service HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST to `path` and return the raw success body.
    ///
    /// Non-2xx answers keep their body as the error payload; transport
    /// failures (including timeouts) carry no status.
    async fn post(&self, path: &str, body: Option<RouteRequestBody>) -> Result<Bytes, SessionError> {
        let url = self.endpoint(path);
        let req = match body {
            Some(b) => self.http.post(&url).json(&b),
            None => self
                .http
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
        };

        let resp = req.send().await.map_err(|e| {
            warn!(%url, error = %e, "route service unreachable");
            SessionError::transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let raw = match resp.bytes().await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(%url, status = status.as_u16(), error = %e, "failed to read error body");
                    Bytes::new()
                }
            };
            warn!(%url, status = status.as_u16(), "route service returned an error");
            return Err(SessionError::Service {
                status: Some(status.as_u16()),
                payload: ErrorPayload::from_body(&raw),
            });
        }

        let raw = resp.bytes().await.map_err(SessionError::transport)?;
        debug!(%url, bytes = raw.len(), "route service answered");
        Ok(raw)
    }
}

impl RouteService for HttpRouteService {
    async fn generate(&self, request: &RouteRequest) -> Result<RouteResponse, SessionError> {
        let raw = self.post(ROUTES_PATH, Some(request.into())).await?;
        wire::decode_route(&raw)
    }

    async fn reset_cache(&self) -> Result<String, SessionError> {
        let raw = self.post(RESET_CACHE_PATH, None).await?;
        wire::decode_reset(&raw)
    }

    async fn export_gpx(&self, request: &RouteRequest) -> Result<Bytes, SessionError> {
        self.post(GPX_PATH, Some(request.into())).await
    }
}
