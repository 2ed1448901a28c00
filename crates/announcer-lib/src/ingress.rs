//! TCP ingress: accepts connections, answers `ping` with `pong`, and hands
//! everything else to the scheduler as a pending message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use announcer_core::text_prep::{classify, Payload, MAX_READ_BYTES, PONG};

use crate::scheduler::{Message, PendingBuffer};

const READ_TIMEOUT: Duration = Duration::from_millis(300);

/// Runs the TCP accept loop until `shutdown` is signaled.
pub async fn run(
    listener: TcpListener,
    pending: Arc<PendingBuffer>,
    on_drop: impl Fn(Message) + Send + Sync + 'static,
    mut shutdown: watch::Receiver<bool>,
) {
    let on_drop = Arc::new(on_drop);
    let next_id = Arc::new(AtomicU64::new(1));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _addr) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(%error, "accept failed");
                        continue;
                    }
                };
                let pending = pending.clone();
                let on_drop = on_drop.clone();
                let next_id = next_id.clone();
                tokio::spawn(async move {
                    handle_connection(stream, pending, on_drop, next_id).await;
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    pending: Arc<PendingBuffer>,
    on_drop: Arc<impl Fn(Message) + Send + Sync + 'static>,
    next_id: Arc<AtomicU64>,
) {
    let mut buf = vec![0u8; MAX_READ_BYTES];
    let mut len = 0usize;

    loop {
        if len >= buf.len() {
            break;
        }
        match tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf[len..])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => len += n,
            Ok(Err(error)) => {
                warn!(%error, "read error");
                return;
            }
            Err(_) => break, // per-read timeout: proceed with whatever arrived
        }
    }

    match classify(&buf[..len]) {
        Payload::Ping => {
            if let Err(error) = stream.write_all(PONG.as_bytes()).await {
                debug!(%error, "failed to write pong");
            }
        }
        Payload::Text(text) => {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            let msg = Message {
                id,
                text,
                arrived_at: std::time::Instant::now(),
            };
            info!(id, "admitted message");
            let evicted = pending.push(msg).await;
            for dropped in evicted {
                on_drop(dropped);
            }
        }
        Payload::Empty => {}
    }
}
