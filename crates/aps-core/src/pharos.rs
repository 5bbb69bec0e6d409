//! Read-only client for the preservation service's member API.
//!
//! Deposits never talk to the service directly — bags are dropped into the
//! staging bucket and ingested on the service's own schedule. The only way
//! to learn a deposit's fate is to poll the event feed here, long after
//! (possibly in a different process than) the upload that started it. The
//! client therefore takes only the external identifier, never an in-memory
//! handle from the transfer path.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use aps_domain::{ArchivalEvent, IngestStatus};

use crate::config::PharosConfig;

const API_USER_HEADER: &str = "X-Pharos-API-User";
const API_KEY_HEADER: &str = "X-Pharos-API-Key";

#[derive(Debug, thiserror::Error)]
pub enum PharosError {
    #[error("event API base URL is invalid: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("event API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event API credentials were rejected")]
    Unauthorized,

    #[error("unexpected event API payload: {0}")]
    UnexpectedPayload(String),
}

/// Authenticated session against the member API's item and object
/// listings. Queries only; the service owns every record it returns.
pub struct PharosClient {
    base: Url,
    api_user: String,
    api_key: String,
    http: Client,
}

impl PharosClient {
    pub fn new(config: &PharosConfig) -> Result<Self, PharosError> {
        let mut base_url = config.base_url.clone();
        // Joining relative endpoint paths drops the last segment of a
        // base that lacks a trailing slash.
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            base: Url::parse(&base_url)?,
            api_user: config.api_user.clone(),
            api_key: config.api_key.clone(),
            http: Client::builder().build()?,
        })
    }

    /// Identifier the remote service files a deposit under:
    /// `{institution}/{bag-name}`.
    pub fn object_identifier(institution: &str, bag_name: &str) -> String {
        format!("{institution}/{bag_name}")
    }

    /// Whether the service knows an intellectual object for `identifier`.
    pub fn identifier_exists(&self, identifier: &str) -> Result<bool, PharosError> {
        let url = self.endpoint("objects", &[("identifier", identifier)])?;
        let page: ResultsPage<serde_json::Value> = self.send(url)?.json()?;
        Ok(!page.results.is_empty())
    }

    /// Latest event recorded for `identifier`, or `None` when the service
    /// has not yet noticed the deposit.
    pub fn item_status(&self, identifier: &str) -> Result<Option<ArchivalEvent>, PharosError> {
        let url = self.endpoint(
            "items",
            &[
                ("object_identifier", identifier),
                ("sort", "date"),
                ("per_page", "1"),
            ],
        )?;
        let page: ResultsPage<ItemRecord> = self.send(url)?.json()?;
        let Some(item) = page.results.into_iter().next() else {
            return Ok(None);
        };
        item.into_event()
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, PharosError> {
        let mut url = self.base.join(path)?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    fn send(&self, url: Url) -> Result<Response, PharosError> {
        debug!(%url, "querying member API");
        let response = self
            .http
            .get(url)
            .header(API_USER_HEADER, &self.api_user)
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PharosError::Unauthorized);
        }
        Ok(response.error_for_status()?)
    }
}

#[derive(Deserialize)]
struct ResultsPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct ItemRecord {
    object_identifier: String,
    status: String,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl ItemRecord {
    fn into_event(self) -> Result<Option<ArchivalEvent>, PharosError> {
        let status = ingest_status(&self.status, self.stage.as_deref())?;
        let recorded_at = self
            .date
            .as_deref()
            .and_then(|date| OffsetDateTime::parse(date, &Rfc3339).ok());
        Ok(Some(ArchivalEvent {
            object_identifier: self.object_identifier,
            status,
            stage: self.stage,
            recorded_at,
        }))
    }
}

/// Map the service's status/stage vocabulary onto the ingest lifecycle.
///
/// A `Success` item only counts as replicated once processing has reached
/// its final stages; before that the object is ingested but not yet copied
/// out to long-term storage.
fn ingest_status(status: &str, stage: Option<&str>) -> Result<IngestStatus, PharosError> {
    match status {
        "Pending" => Ok(IngestStatus::Pending),
        "Started" => Ok(IngestStatus::Accepted),
        "Success" => match stage {
            Some("Record" | "Cleanup") => Ok(IngestStatus::Replicated),
            _ => Ok(IngestStatus::Ingested),
        },
        "Failed" | "Cancelled" => Ok(IngestStatus::Failed),
        other => Err(PharosError::UnexpectedPayload(format!(
            "unknown item status '{other}'"
        ))),
    }
}
