//! Shared configuration and dispatch types for the announcer voice service.
//!
//! Kept dependency-light so both `announcer-lib` and `announcer-cli` can
//! depend on them without pulling in tokio or reqwest.

use serde::{Deserialize, Serialize};

/// How the scheduler treats a new message arriving while others are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// FIFO; oldest pending message is evicted on overflow.
    Queue,
    /// At most one pending message; arrival evicts whatever is already queued.
    LatestWins,
}

/// TTS collaborator configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub kokoro_url: String,
    pub voice: String,
    pub lang: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            kokoro_url: "http://localhost:8880".into(),
            voice: "af_heart".into(),
            lang: "a".into(),
        }
    }
}

/// Playback and backlog policy configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub dispatch_policy: DispatchPolicy,
    pub max_queue: usize,
    pub interrupt: bool,
    pub min_duration: f32,
    pub interrupt_chime: bool,
    pub drop_sound: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            dispatch_policy: DispatchPolicy::Queue,
            max_queue: 10,
            interrupt: true,
            min_duration: 1.5,
            interrupt_chime: true,
            drop_sound: true,
        }
    }
}

/// Full server configuration, assembled by the launcher from CLI flags.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tts: TtsConfig,
    pub audio: AudioConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 20202,
            tts: TtsConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}
