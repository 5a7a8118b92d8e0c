//! TTS generation client.
//!
//! Speaks to an edge-tts-compatible HTTP backend: POST text + voice id +
//! rate adjustment, receive WAV bytes. The response body is streamed into a
//! scoped temporary file so partial downloads clean themselves up on every
//! exit path, then read back and size-patched before it reaches the cache.

use std::io::Write;

use futures_util::StreamExt;
use tracing::{debug, warn};

use parlo_core::text::{is_speakable, normalize};
use parlo_core::types::BackendConfig;
use parlo_core::wav::fix_wav_sizes;
use parlo_core::{Error, Result};

/// A synthesis backend. The engine is generic over this so tests can inject
/// a fake that never touches the network.
pub trait Synthesizer: Send + Sync + 'static {
    /// Generate audio bytes for one clip. Backend trouble of any kind —
    /// network failure, bad voice id, empty synthesis — comes back as a
    /// typed [`Error::Generation`], never a panic.
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Map a speed factor to the backend's rate-adjustment parameter.
///
/// The mapping is monotonic and reversible: `1.0 → "+0%"`, `2.0 → "+100%"`,
/// `0.8 → "-20%"`. Percentages are rounded to whole numbers, matching the
/// backend's accepted grammar.
pub fn rate_adjustment(speed: f32) -> String {
    let percent = ((speed - 1.0) * 100.0).round() as i32;
    if percent >= 0 {
        format!("+{percent}%")
    } else {
        format!("{percent}%")
    }
}

/// HTTP client for the synthesis backend.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
    retries: u32,
}

impl HttpSynthesizer {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/synthesize", config.url.trim_end_matches('/')),
            retries: config.retries,
        }
    }

    async fn attempt(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "text": text,
            "voice": voice,
            "rate": rate_adjustment(speed),
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("backend {status}: {detail}")));
        }

        // Stream into a scoped temporary; dropped (and deleted) on any
        // failure below.
        let mut tmp = tempfile::NamedTempFile::new()
            .map_err(|e| Error::Generation(format!("temp file: {e}")))?;

        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Generation(format!("stream error: {e}")))?;
            tmp.write_all(&chunk)
                .map_err(|e| Error::Generation(format!("temp write: {e}")))?;
        }
        tmp.flush()
            .map_err(|e| Error::Generation(format!("temp flush: {e}")))?;

        let bytes = std::fs::read(tmp.path())
            .map_err(|e| Error::Generation(format!("temp read: {e}")))?;

        if bytes.is_empty() {
            return Err(Error::Generation("empty synthesis".into()));
        }

        // Chunked-transfer backends leave sentinel RIFF sizes behind.
        Ok(fix_wav_sizes(bytes))
    }
}

impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>> {
        let text = normalize(text);
        if !is_speakable(&text) {
            return Err(Error::NoContent);
        }

        let mut last_err = Error::Generation("no attempt made".into());
        for attempt in 0..=self.retries {
            match self.attempt(&text, voice, speed).await {
                Ok(bytes) => {
                    debug!(voice, speed, bytes = bytes.len(), "synthesized clip");
                    return Ok(bytes);
                }
                Err(e) => {
                    if attempt < self.retries {
                        warn!(voice, attempt, "synthesis failed, retrying: {e}");
                    }
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
