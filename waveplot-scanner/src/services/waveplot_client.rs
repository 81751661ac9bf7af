//! WavePlot server API client
//!
//! Upload, link and fetch calls against the WavePlot HTTP API. Redirects are
//! disabled: the server answers an upload of an already-known WavePlot with
//! `303 See Other` and the existing identifier in the body, which must be
//! read rather than followed.

use crate::models::{Metadata, WavePlotRecord};
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use waveplot_common::waveform;

const USER_AGENT: &str = concat!("waveplot-scanner/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// WavePlot client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Record has no server identifier (not uploaded, or upload failed)
    #[error("WavePlot has no remote identifier")]
    MissingIdentifier,
}

/// How the server accepted an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A new WavePlot was stored
    Created(String),
    /// An identical WavePlot already existed; its identifier is reused
    Duplicate(String),
}

impl UploadOutcome {
    pub fn uuid(&self) -> &str {
        match self {
            UploadOutcome::Created(uuid) | UploadOutcome::Duplicate(uuid) => uuid,
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    editor: &'a str,
    image: String,
    dr_level: f32,
    length: u32,
    trimmed_length: u32,
    source_type: &'a str,
    sample_rate: u32,
    bit_depth: u16,
    bit_rate: u32,
    num_channels: u8,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct LinkRequest<'a> {
    #[serde(flatten)]
    metadata: &'a Metadata,
    waveplot_uuid: &'a str,
}

/// `303` body
#[derive(Debug, Deserialize)]
struct DuplicateResponse {
    message: String,
}

/// `2xx` upload body
#[derive(Debug, Deserialize)]
struct CreatedResponse {
    uuid: String,
    #[serde(default)]
    image_sha1: Option<String>,
    #[serde(default)]
    thumbnail: Option<ThumbnailField>,
    #[serde(default)]
    sonic_hash: Option<HashField>,
}

/// Summary returned by `GET /api/waveplot/{uuid}`
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    length: u32,
    #[serde(default)]
    trimmed_length: Option<u32>,
    dr_level: f32,
    source_type: String,
    sample_rate: u32,
    bit_depth: u16,
    bit_rate: u32,
    num_channels: u8,
    #[serde(default)]
    image_sha1: Option<String>,
    #[serde(default)]
    thumbnail: Option<ThumbnailField>,
    #[serde(default)]
    sonic_hash: Option<HashField>,
    version: String,
}

/// Body of `GET /api/waveplot/{uuid}/full`
#[derive(Debug, Deserialize)]
struct FullResponse {
    data: String,
}

/// Thumbnail as sent by the server: a point array or base64 bytes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThumbnailField {
    Points(Vec<u8>),
    Encoded(String),
}

impl ThumbnailField {
    fn into_points(self) -> Option<Vec<u8>> {
        match self {
            ThumbnailField::Points(points) => Some(points),
            ThumbnailField::Encoded(encoded) => match general_purpose::STANDARD.decode(&encoded) {
                Ok(points) => Some(points),
                Err(e) => {
                    tracing::warn!("Ignoring undecodable thumbnail: {}", e);
                    None
                }
            },
        }
    }
}

/// Hash as sent by the server: text or a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HashField {
    Text(String),
    Number(u64),
}

impl HashField {
    fn into_string(self) -> String {
        match self {
            HashField::Text(text) => text,
            HashField::Number(n) => n.to_string(),
        }
    }
}

/// WavePlot API client
///
/// Holds the editor key; one client serves the upload worker for the whole run.
pub struct WavePlotClient {
    http_client: reqwest::Client,
    base_url: String,
    editor_key: String,
}

impl WavePlotClient {
    pub fn new(base_url: &str, editor_key: String) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            editor_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a WavePlot and record the server's identifier and hashes on it
    pub async fn upload(&self, record: &mut WavePlotRecord) -> Result<UploadOutcome, ClientError> {
        let image = waveform::encode_image(&record.intensity_data)
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        let body = UploadRequest {
            editor: &self.editor_key,
            image,
            dr_level: record.dynamic_range_rating,
            length: record.duration_seconds,
            trimmed_length: record.duration_seconds,
            source_type: &record.source_format,
            sample_rate: record.sample_rate,
            bit_depth: record.bit_depth,
            bit_rate: record.bit_rate,
            num_channels: record.num_channels,
            version: &record.engine_version,
        };

        let response = self
            .http_client
            .post(format!("{}/api/waveplot", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::SEE_OTHER {
            let duplicate: DuplicateResponse = response
                .json()
                .await
                .map_err(|e| ClientError::ParseError(e.to_string()))?;

            tracing::info!(uuid = %duplicate.message, "WavePlot already on server");
            record.remote_uuid = Some(duplicate.message.clone());
            return Ok(UploadOutcome::Duplicate(duplicate.message));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError(status.as_u16(), error_text));
        }

        let created: CreatedResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        tracing::info!(uuid = %created.uuid, "WavePlot uploaded");

        record.remote_uuid = Some(created.uuid.clone());
        record.image_hash = created.image_sha1;
        record.thumbnail = created.thumbnail.and_then(ThumbnailField::into_points);
        record.sonic_hash = created.sonic_hash.map(HashField::into_string);

        Ok(UploadOutcome::Created(created.uuid))
    }

    /// Link an uploaded WavePlot to its tag metadata
    ///
    /// The response body is not used.
    pub async fn link(&self, record: &WavePlotRecord, metadata: &Metadata) -> Result<(), ClientError> {
        let uuid = record
            .remote_uuid
            .as_deref()
            .ok_or(ClientError::MissingIdentifier)?;

        let body = LinkRequest {
            metadata,
            waveplot_uuid: uuid,
        };

        tracing::debug!(uuid = %uuid, metadata = ?metadata, "Linking WavePlot");

        let response = self
            .http_client
            .post(format!("{}/api/waveplot_context", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError(status.as_u16(), error_text));
        }

        Ok(())
    }

    /// Fetch a WavePlot (summary plus full intensity data) by identifier
    pub async fn fetch(&self, uuid: &str) -> Result<WavePlotRecord, ClientError> {
        let url = format!("{}/api/waveplot/{}", self.base_url, uuid);

        let summary: SummaryResponse = self.get_json(&url).await?;
        let full: FullResponse = self.get_json(&format!("{}/full", url)).await?;

        let intensity_data = waveform::decode_base64(&full.data)
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        Ok(WavePlotRecord {
            duration_seconds: summary.length,
            trimmed_length: summary.trimmed_length,
            num_channels: summary.num_channels,
            bit_depth: summary.bit_depth,
            bit_rate: summary.bit_rate,
            sample_rate: summary.sample_rate,
            source_format: summary.source_type,
            dynamic_range_rating: summary.dr_level,
            intensity_data,
            engine_version: summary.version,
            remote_uuid: Some(uuid.to_string()),
            image_hash: summary.image_sha1,
            thumbnail: summary.thumbnail.and_then(ThumbnailField::into_points),
            sonic_hash: summary.sonic_hash.map(HashField::into_string),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_slash() {
        let client = WavePlotClient::new("http://waveplot.net/", "key".to_string()).unwrap();
        assert_eq!(client.base_url(), "http://waveplot.net");
    }

    #[test]
    fn test_link_body_flattens_metadata() {
        let metadata = Metadata {
            recording_id: Some("rec".to_string()),
            ..Default::default()
        };
        let body = LinkRequest {
            metadata: &metadata,
            waveplot_uuid: "wp-1",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["recording_mbid"], "rec");
        assert_eq!(json["waveplot_uuid"], "wp-1");
        assert!(json["disc_number"].is_null());
    }

    #[test]
    fn test_thumbnail_field_forms() {
        let points: ThumbnailField = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(points.into_points(), Some(vec![1, 2, 3]));

        let encoded: ThumbnailField = serde_json::from_str("\"AQID\"").unwrap();
        assert_eq!(encoded.into_points(), Some(vec![1, 2, 3]));

        let garbage: ThumbnailField = serde_json::from_str("\"!!\"").unwrap();
        assert_eq!(garbage.into_points(), None);
    }

    #[test]
    fn test_hash_field_forms() {
        let text: HashField = serde_json::from_str("\"beef\"").unwrap();
        assert_eq!(text.into_string(), "beef");
        let number: HashField = serde_json::from_str("48879").unwrap();
        assert_eq!(number.into_string(), "48879");
    }

    #[test]
    fn test_upload_outcome_uuid() {
        assert_eq!(UploadOutcome::Duplicate("a".to_string()).uuid(), "a");
        assert_eq!(UploadOutcome::Created("b".to_string()).uuid(), "b");
    }

    #[tokio::test]
    async fn test_link_without_uuid_is_rejected() {
        let client = WavePlotClient::new("http://127.0.0.1:9", "key".to_string()).unwrap();
        let result = client
            .link(&WavePlotRecord::default(), &Metadata::default())
            .await;
        assert!(matches!(result, Err(ClientError::MissingIdentifier)));
    }
}
