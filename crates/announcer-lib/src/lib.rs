//! announcer-lib — the announcement pipeline: TCP ingress, scheduling,
//! TTS synthesis, and subprocess-based playback with gap-free interrupts.

pub mod ingress;
pub mod player;
pub mod scheduler;
pub mod server;
pub mod sound_assets;
pub mod synthesizer;
pub mod tts;

// Re-export announcer-core for convenience
pub use announcer_core;
