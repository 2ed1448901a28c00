//! TTS collaborator interface and the Kokoro-backed HTTP adapter.
//!
//! `TtsBackend` is the seam the rest of the pipeline depends on — the
//! Synthesizer never knows it's talking to an HTTP server rather than an
//! in-process model. A backend that does local inference is free to hop to
//! `spawn_blocking` internally; that's invisible from here.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, warn};

use announcer_core::wav::pcm16_bytes_to_f32;

/// Sample rate Kokoro streams PCM at.
const KOKORO_SAMPLE_RATE: u32 = 24_000;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(1);
const HEALTH_CHECK_POLL_INTERVAL: Duration = Duration::from_millis(500);
const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(15);

/// The TTS collaborator interface consumed by the Synthesizer.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Verify the backend is reachable. Called once at startup; failure is fatal.
    async fn initialize(&self) -> Result<(), String>;

    /// Convert text to normalized mono float32 samples at `sample_rate()`.
    /// Returns `Ok(None)` for degenerate input the backend declines to speak.
    async fn synthesize(&self, text: &str) -> Result<Option<Vec<f32>>, String>;

    /// Sample rate of audio returned by `synthesize`.
    fn sample_rate(&self) -> u32;

    /// Release any held resources. A no-op for adapters that don't own a process.
    async fn cleanup(&self) {}
}

/// Adapter for a Kokoro-compatible HTTP TTS server (OpenAI speech-API shape).
pub struct KokoroHttpTts {
    client: reqwest::Client,
    base_url: String,
    voice: String,
    lang: String,
}

impl KokoroHttpTts {
    pub fn new(base_url: impl Into<String>, voice: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            voice: voice.into(),
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl TtsBackend for KokoroHttpTts {
    async fn initialize(&self) -> Result<(), String> {
        let deadline = tokio::time::Instant::now() + HEALTH_CHECK_DEADLINE;
        loop {
            if tokio::time::Instant::now() > deadline {
                return Err(format!(
                    "kokoro backend at {} did not become reachable within {:?}",
                    self.base_url, HEALTH_CHECK_DEADLINE
                ));
            }

            match self
                .client
                .get(&self.base_url)
                .timeout(HEALTH_CHECK_TIMEOUT)
                .send()
                .await
            {
                Ok(_) => return Ok(()),
                Err(_) => tokio::time::sleep(HEALTH_CHECK_POLL_INTERVAL).await,
            }
        }
    }

    async fn synthesize(&self, text: &str) -> Result<Option<Vec<f32>>, String> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = serde_json::json!({
            "input": text,
            "voice": self.voice,
            "lang": self.lang,
            "model": "kokoro",
            "response_format": "pcm",
            "stream": true,
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, body = %text, "kokoro rejected synthesis request");
            return Err(format!("kokoro returned {status}: {text}"));
        }

        let mut stream = resp.bytes_stream();
        let mut leftover: Option<u8> = None;
        let mut samples = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("stream error: {e}"))?;
            let (mut decoded, lo) = pcm16_bytes_to_f32(&chunk, leftover.take());
            leftover = lo;
            samples.append(&mut decoded);
        }

        if samples.is_empty() {
            debug!("kokoro returned empty audio for {} chars", text.len());
            return Ok(None);
        }

        Ok(Some(samples))
    }

    fn sample_rate(&self) -> u32 {
        KOKORO_SAMPLE_RATE
    }

    async fn cleanup(&self) {
        // The adapter doesn't own the remote process.
    }
}

/// An in-memory backend for tests: returns a fixed buffer per call, or an
/// error/empty result if configured to, without touching the network.
#[cfg(test)]
pub struct StubTts {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl TtsBackend for StubTts {
    async fn initialize(&self) -> Result<(), String> {
        if self.fail {
            Err("stub configured to fail".into())
        } else {
            Ok(())
        }
    }

    async fn synthesize(&self, text: &str) -> Result<Option<Vec<f32>>, String> {
        if self.fail {
            return Err("stub synth failure".into());
        }
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.samples.clone()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_returns_configured_samples() {
        let tts = StubTts {
            sample_rate: 24_000,
            samples: vec![0.1, 0.2, 0.3],
            fail: false,
        };
        let out = tts.synthesize("hello").await.unwrap();
        assert_eq!(out, Some(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn stub_reports_failure() {
        let tts = StubTts {
            sample_rate: 24_000,
            samples: vec![],
            fail: true,
        };
        assert!(tts.initialize().await.is_err());
        assert!(tts.synthesize("hello").await.is_err());
    }

    #[tokio::test]
    async fn synthesize_empty_text_returns_none() {
        let tts = KokoroHttpTts::new("http://localhost:1", "af_heart", "a");
        let out = tts.synthesize("   ").await.unwrap();
        assert_eq!(out, None);
    }
}
