//! Audio fingerprint lookup (ACRCloud identify API, v1)
//!
//! Sends the first few megabytes of a file to the identify endpoint and reads
//! back artist and title. "No match" is a normal [`RecognitionResult`]; only a
//! service that cannot be reached or answers garbage is an error.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::core::config;
use crate::core::utils::format_display_name;

type HmacSha1 = Hmac<Sha1>;

const IDENTIFY_PATH: &str = "/v1/identify";
const DATA_TYPE: &str = "audio";
const SIGNATURE_VERSION: &str = "1";

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Recognition service unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed recognition response: {0}")]
    Malformed(String),

    #[error("Invalid recognizer configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed identify response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// 0 on success; 1001 means "no result"
    pub status_code: i64,
    pub status_msg: String,
    pub artist: Option<String>,
    pub title: Option<String>,
}

impl RecognitionResult {
    pub fn is_match(&self) -> bool {
        self.status_code == 0 && (self.artist.is_some() || self.title.is_some())
    }

    /// `(artist, title)` when the service found the track
    pub fn track(&self) -> Option<(&str, &str)> {
        if !self.is_match() {
            return None;
        }
        Some((
            self.artist.as_deref().unwrap_or_default(),
            self.title.as_deref().unwrap_or_default(),
        ))
    }

    /// "Artist - Title" for a match
    pub fn display_name(&self) -> Option<String> {
        self.track().map(|(artist, title)| format_display_name(artist, title))
    }
}

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    status: IdentifyStatus,
    #[serde(default)]
    metadata: Option<IdentifyMetadata>,
}

#[derive(Debug, Deserialize)]
struct IdentifyStatus {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct IdentifyMetadata {
    #[serde(default)]
    music: Vec<MusicEntry>,
}

#[derive(Debug, Deserialize)]
struct MusicEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtistEntry {
    name: String,
}

/// Parses the identify JSON body.
///
/// Only the first music entry and its first artist are used.
pub fn parse_response(body: &str) -> Result<RecognitionResult, RecognitionError> {
    let resp: IdentifyResponse = serde_json::from_str(body).map_err(|e| RecognitionError::Malformed(e.to_string()))?;

    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let (artist, title) = if resp.status.code == 0 {
        resp.metadata
            .and_then(|m| m.music.into_iter().next())
            .map(|music| {
                let artist = music.artists.first().and_then(|a| non_empty(&a.name));
                let title = music.title.as_deref().and_then(non_empty);
                (artist, title)
            })
            .unwrap_or((None, None))
    } else {
        (None, None)
    };

    Ok(RecognitionResult {
        status_code: resp.status.code,
        status_msg: resp.status.msg,
        artist,
        title,
    })
}

/// base64(HMAC-SHA1(secret, "POST\n/v1/identify\n<key>\naudio\n1\n<timestamp>"))
pub fn sign(access_key: &str, access_secret: &str, timestamp: i64) -> Result<String, RecognitionError> {
    let string_to_sign = format!(
        "POST\n{}\n{}\n{}\n{}\n{}",
        IDENTIFY_PATH, access_key, DATA_TYPE, SIGNATURE_VERSION, timestamp
    );
    hmac_sha1_base64(access_secret.as_bytes(), string_to_sign.as_bytes())
}

fn hmac_sha1_base64(key: &[u8], data: &[u8]) -> Result<String, RecognitionError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| RecognitionError::Config(e.to_string()))?;
    mac.update(data);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Identifies the track in a local audio file.
#[async_trait]
pub trait TrackRecognizer: Send + Sync {
    async fn recognize(&self, audio_path: &Path) -> Result<RecognitionResult, RecognitionError>;
}

/// Credentials and limits for the identify endpoint
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub host: String,
    pub access_key: String,
    pub access_secret: SecretString,
    pub timeout: Duration,
    pub max_sample_bytes: usize,
}

impl RecognizerConfig {
    pub fn new(
        host: impl Into<String>,
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            access_key: access_key.into(),
            access_secret: SecretString::from(access_secret.into()),
            timeout,
            max_sample_bytes: config::recognition::MAX_SAMPLE_BYTES,
        }
    }

    /// `None` unless ACR_HOST, ACR_ACCESS_KEY and ACR_ACCESS_SECRET are all set
    pub fn from_env() -> Option<Self> {
        let host = config::recognition::HOST.clone()?;
        let key = config::recognition::ACCESS_KEY.clone()?;
        let secret = config::recognition::ACCESS_SECRET.clone()?;
        Some(Self::new(host, key, secret, config::recognition::timeout()))
    }

    /// `https://<host>/v1/identify`; a host given with a scheme is used as is
    pub fn endpoint(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", host, IDENTIFY_PATH)
        } else {
            format!("https://{}{}", host, IDENTIFY_PATH)
        }
    }
}

pub struct AcrCloudRecognizer {
    config: RecognizerConfig,
    client: Client,
}

impl AcrCloudRecognizer {
    pub fn new(config: RecognizerConfig) -> Result<Self, RecognitionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecognitionError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    async fn read_sample(&self, audio_path: &Path) -> Result<Vec<u8>, RecognitionError> {
        let file = tokio::fs::File::open(audio_path).await?;
        let mut sample = Vec::new();
        file.take(self.config.max_sample_bytes as u64)
            .read_to_end(&mut sample)
            .await?;
        Ok(sample)
    }
}

#[async_trait]
impl TrackRecognizer for AcrCloudRecognizer {
    async fn recognize(&self, audio_path: &Path) -> Result<RecognitionResult, RecognitionError> {
        let sample = self.read_sample(audio_path).await?;
        let sample_bytes = sample.len();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign(
            &self.config.access_key,
            self.config.access_secret.expose_secret(),
            timestamp,
        )?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sample".to_string());

        let form = Form::new()
            .part("sample", Part::bytes(sample).file_name(file_name))
            .text("access_key", self.config.access_key.clone())
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION)
            .text("signature", signature)
            .text("sample_bytes", sample_bytes.to_string())
            .text("timestamp", timestamp.to_string());

        log::info!("🎵 Recognizing {} ({} bytes sample)", audio_path.display(), sample_bytes);

        let resp = self
            .client
            .post(self.config.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognitionError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RecognitionError::Unavailable(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RecognitionError::Unavailable(e.to_string()))?;
        let result = parse_response(&body)?;

        match result.display_name() {
            Some(name) => log::info!("✅ Recognized: {}", name),
            None => log::info!(
                "🔍 No match (status {}: {})",
                result.status_code,
                result.status_msg
            ),
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_success() {
        let body = r#"{"status":{"code":0,"msg":"Success"},
            "metadata":{"music":[{"artists":[{"name":"A"},{"name":"B"}],"title":"T"},
                                 {"artists":[{"name":"X"}],"title":"Y"}]}}"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.track(), Some(("A", "T")));
        assert_eq!(result.display_name().as_deref(), Some("A - T"));
        assert_eq!(result.status_msg, "Success");
    }

    #[test]
    fn test_parse_no_result() {
        let body = r#"{"status":{"code":1001,"msg":"No result"}}"#;
        let result = parse_response(body).unwrap();
        assert_eq!(result.status_code, 1001);
        assert!(!result.is_match());
        assert_eq!(result.track(), None);
    }

    #[test]
    fn test_parse_success_without_music() {
        let body = r#"{"status":{"code":0,"msg":"Success"},"metadata":{"music":[]}}"#;
        assert!(!parse_response(body).unwrap().is_match());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_response("<html>502</html>"),
            Err(RecognitionError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(r#"{"metadata":{}}"#),
            Err(RecognitionError::Malformed(_))
        ));
    }

    #[test]
    fn test_sign_is_deterministic_base64() {
        let a = sign("key", "secret", 1_700_000_000).unwrap();
        let b = sign("key", "secret", 1_700_000_000).unwrap();
        let c = sign("key", "secret", 1_700_000_001).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // SHA-1 digest is 20 bytes -> 28 base64 chars
        assert_eq!(a.len(), 28);
        assert_eq!(
            base64::engine::general_purpose::STANDARD.decode(&a).unwrap().len(),
            20
        );
    }

    #[test]
    fn test_hmac_sha1_base64_known_vector() {
        // RFC 2202 test case 2: effcdf6ae5eb2fa2d27416d5f184df9c259a7c79
        assert_eq!(
            hmac_sha1_base64(b"Jefe", b"what do ya want for nothing?").unwrap(),
            "7/zfauXrL6LSdBbV8YTfnCWafHk="
        );
    }

    #[test]
    fn test_sign_known_value() {
        assert_eq!(sign("key", "secret", 1_700_000_000).unwrap(), "tWbqxXkbyadGeaHIJS/OzfF+KdU=");
        assert_eq!(
            sign("key", "secret", 1_700_000_000).unwrap(),
            hmac_sha1_base64(b"secret", b"POST\n/v1/identify\nkey\naudio\n1\n1700000000").unwrap()
        );
    }

    #[test]
    fn test_endpoint() {
        let cfg = RecognizerConfig::new("identify-eu-west-1.acrcloud.com", "k", "s", Duration::from_secs(10));
        assert_eq!(cfg.endpoint(), "https://identify-eu-west-1.acrcloud.com/v1/identify");

        let cfg = RecognizerConfig::new("http://127.0.0.1:8080/", "k", "s", Duration::from_secs(10));
        assert_eq!(cfg.endpoint(), "http://127.0.0.1:8080/v1/identify");
    }
}
