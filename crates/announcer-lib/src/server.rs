//! Wires ingress, scheduling, synthesis and playback into one running
//! service, and owns its graceful shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use announcer_core::types::ServerConfig;

use crate::player;
use crate::scheduler::{Message, PendingBuffer};
use crate::sound_assets::SoundAssets;
use crate::synthesizer;
use crate::tts::TtsBackend;

/// A fully constructed, not-yet-running announcement service.
pub struct Server {
    config: ServerConfig,
    tts: Arc<dyn TtsBackend>,
    pending: Arc<PendingBuffer>,
    sounds: SoundAssets,
}

impl Server {
    /// Bind nothing yet; construct shared state and health-check the TTS backend.
    pub async fn build(config: ServerConfig, tts: Arc<dyn TtsBackend>) -> Result<Self, String> {
        tts.initialize().await?;

        let pending = Arc::new(PendingBuffer::new(
            config.audio.dispatch_policy,
            config.audio.max_queue,
        ));

        let sounds = SoundAssets::generate().map_err(|e| format!("failed to generate sound assets: {e}"))?;

        Ok(Self {
            config,
            tts,
            pending,
            sounds,
        })
    }

    /// Bind the TCP listener and run until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("failed to bind {addr}: {e}"))?;
        info!(%addr, "announcer listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = mpsc::channel(2);

        let player_cmd = player::discover_player();
        let drop_sound = self.config.audio.drop_sound;
        let chime_for_player = if self.config.audio.interrupt_chime {
            player_cmd
                .clone()
                .map(|cmd| (cmd, self.sounds.chime_path.clone()))
        } else {
            None
        };

        let drop_path = self.sounds.drop_path.clone();
        let on_drop = move |msg: Message| {
            info!(id = msg.id, "dropped pending message (backlog policy)");
            if drop_sound {
                if let Some(cmd) = player_cmd.clone() {
                    player::play_fire_and_forget(cmd, drop_path.clone());
                }
            }
        };

        let ingress = tokio::spawn(crate::ingress::run(
            listener,
            self.pending.clone(),
            on_drop,
            shutdown_rx.clone(),
        ));
        let synth = tokio::spawn(synthesizer::run(
            self.pending.clone(),
            self.tts.clone(),
            ready_tx,
            shutdown_rx.clone(),
        ));
        let play = tokio::spawn(player::run(
            ready_rx,
            self.config.audio.clone(),
            chime_for_player,
            shutdown_rx.clone(),
        ));

        wait_for_shutdown_signal().await;
        info!("shutdown signal received, draining");
        let _ = shutdown_tx.send(true);

        for (name, handle) in [("ingress", ingress), ("synthesizer", synth), ("player", play)] {
            if let Err(error) = handle.await {
                warn!(task = name, %error, "worker task panicked during shutdown");
            }
        }

        self.tts.cleanup().await;
        self.sounds.cleanup();
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(error) => {
            error!(%error, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
