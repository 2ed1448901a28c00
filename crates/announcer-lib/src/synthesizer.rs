//! The synthesizer worker: pulls pending messages one at a time and turns
//! them into playable WAV files.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use announcer_core::wav::write_wav_f32;

use crate::scheduler::PendingBuffer;
use crate::tts::TtsBackend;

/// Synthesized audio awaiting playback.
pub struct ReadyAudio {
    pub id: u64,
    pub path: PathBuf,
    pub text: String,
}

/// Runs the synthesizer loop until `shutdown` is signaled.
///
/// There is exactly one synthesizer worker — the "one TTS call in flight at
/// a time" invariant comes from there only ever being a single caller of this
/// function, not from any locking inside it.
pub async fn run(
    pending: Arc<PendingBuffer>,
    tts: Arc<dyn TtsBackend>,
    ready_tx: mpsc::Sender<ReadyAudio>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = pending.wait_non_empty() => {}
            _ = shutdown.changed() => {}
        }
        if *shutdown.borrow() {
            return;
        }

        let Some(msg) = pending.pop().await else {
            continue;
        };

        let samples = match tts.synthesize(&msg.text).await {
            Ok(Some(samples)) if !samples.is_empty() => samples,
            Ok(_) => {
                warn!(id = msg.id, "synthesis returned no audio, dropping message");
                continue;
            }
            Err(error) => {
                warn!(id = msg.id, %error, "synthesis failed, dropping message");
                continue;
            }
        };

        let wav = write_wav_f32(&samples, tts.sample_rate());

        let tmp = match tempfile::Builder::new()
            .prefix("announcer-utterance-")
            .suffix(".wav")
            .tempfile()
        {
            Ok(f) => f,
            Err(error) => {
                warn!(id = msg.id, %error, "failed to create temp file, dropping message");
                continue;
            }
        };
        let path = tmp.path().to_path_buf();
        if let Err(error) = tokio::fs::write(&path, &wav).await {
            warn!(id = msg.id, %error, "failed to write wav, dropping message");
            continue;
        }
        // Ownership of the file passes to the ready-audio record; the Player
        // deletes it after playback. Detach it from the NamedTempFile guard
        // so it isn't unlinked when `tmp` drops.
        let _ = tmp.keep();

        info!(id = msg.id, chars = msg.text.len(), "synthesized utterance");

        if ready_tx
            .send(ReadyAudio {
                id: msg.id,
                path,
                text: msg.text,
            })
            .await
            .is_err()
        {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::StubTts;
    use announcer_core::types::DispatchPolicy;
    use std::time::Duration;

    #[tokio::test]
    async fn synthesizes_pending_message_into_wav_file() {
        let pending = Arc::new(PendingBuffer::new(DispatchPolicy::Queue, 10));
        pending
            .push(crate::scheduler::Message {
                id: 1,
                text: "hello".into(),
                arrived_at: std::time::Instant::now(),
            })
            .await;

        let tts: Arc<dyn TtsBackend> = Arc::new(StubTts {
            sample_rate: 24_000,
            samples: vec![0.0; 1000],
            fail: false,
        });
        let (ready_tx, mut ready_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run(pending, tts, ready_tx, shutdown_rx));

        let ready = tokio::time::timeout(Duration::from_secs(1), ready_rx.recv())
            .await
            .expect("should produce ready audio")
            .unwrap();
        assert_eq!(ready.id, 1);
        assert!(ready.path.exists());
        let bytes = std::fs::read(&ready.path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
        let _ = std::fs::remove_file(&ready.path);
    }

    #[tokio::test]
    async fn drops_message_on_synthesis_failure() {
        let pending = Arc::new(PendingBuffer::new(DispatchPolicy::Queue, 10));
        pending
            .push(crate::scheduler::Message {
                id: 1,
                text: "hello".into(),
                arrived_at: std::time::Instant::now(),
            })
            .await;
        pending
            .push(crate::scheduler::Message {
                id: 2,
                text: "world".into(),
                arrived_at: std::time::Instant::now(),
            })
            .await;

        let tts: Arc<dyn TtsBackend> = Arc::new(StubTts {
            sample_rate: 24_000,
            samples: vec![],
            fail: true,
        });
        let (ready_tx, mut ready_rx) = mpsc::channel(2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run(pending, tts, ready_tx, shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = shutdown_tx.send(true);
        handle.await.unwrap();

        assert!(ready_rx.try_recv().is_err());
    }
}
