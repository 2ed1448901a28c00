//! announcer — local audio announcement service.
//!
//! ```text
//! announcer [--port 20202] [--voice af_heart] [--lang a] [--kokoro-url ...]
//!           [--interrupt | --no-interrupt] [--min-duration 1.5]
//!           [--queue | --no-queue] [--max-queue 10]
//!           [--interrupt-chime | --no-interrupt-chime]
//!           [--drop-sound | --no-drop-sound]
//! ```

use std::sync::Arc;

use clap::Parser;

use announcer_core::types::{AudioConfig, DispatchPolicy, ServerConfig, TtsConfig};
use announcer_lib::server::Server;
use announcer_lib::tts::KokoroHttpTts;

/// Local audio announcement service: TCP ingress -> TTS synthesis -> subprocess playback.
#[derive(Parser)]
#[command(name = "announcer", version, about)]
struct Cli {
    /// Listen port
    #[arg(long, default_value_t = 20202)]
    port: u16,

    /// Listen host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// TTS voice
    #[arg(long, default_value = "af_heart")]
    voice: String,

    /// TTS language code
    #[arg(long, default_value = "a")]
    lang: String,

    /// Kokoro-compatible TTS server URL
    #[arg(long, default_value = "http://localhost:8880")]
    kokoro_url: String,

    /// Allow an in-progress utterance to be interrupted by a ready successor (default)
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "no_interrupt")]
    interrupt: bool,

    /// Disable interrupting an in-progress utterance
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "interrupt")]
    no_interrupt: bool,

    /// Minimum seconds an utterance must play before it can be interrupted
    #[arg(long, default_value_t = 1.5)]
    min_duration: f32,

    /// FIFO dispatch policy (default)
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "no_queue")]
    queue: bool,

    /// Latest-wins dispatch policy
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "queue")]
    no_queue: bool,

    /// Maximum number of pending messages before the oldest is dropped
    #[arg(long, default_value_t = 10)]
    max_queue: usize,

    /// Play a transition chime when interrupting an utterance (default)
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "no_interrupt_chime")]
    interrupt_chime: bool,

    /// Disable the transition chime played on interrupt
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "interrupt_chime")]
    no_interrupt_chime: bool,

    /// Play a short tone when a message is dropped for backlog reasons (default)
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "no_drop_sound")]
    drop_sound: bool,

    /// Disable the drop-tone played when a message is evicted for backlog reasons
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "drop_sound")]
    no_drop_sound: bool,

    /// Log verbosity, also overridable via RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        tts: TtsConfig {
            kokoro_url: cli.kokoro_url,
            voice: cli.voice,
            lang: cli.lang,
        },
        audio: AudioConfig {
            dispatch_policy: if cli.no_queue {
                DispatchPolicy::LatestWins
            } else {
                DispatchPolicy::Queue
            },
            max_queue: cli.max_queue,
            interrupt: !cli.no_interrupt,
            min_duration: cli.min_duration,
            interrupt_chime: !cli.no_interrupt_chime,
            drop_sound: !cli.no_drop_sound,
        },
    };

    let tts = Arc::new(KokoroHttpTts::new(
        config.tts.kokoro_url.clone(),
        config.tts.voice.clone(),
        config.tts.lang.clone(),
    ));

    let server = match Server::build(config, tts).await {
        Ok(server) => server,
        Err(error) => {
            tracing::error!(%error, "startup failed");
            return std::process::ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
