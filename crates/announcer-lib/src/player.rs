//! The player: drives an external audio-player subprocess and implements
//! gap-free interrupts.
//!
//! An utterance is only ever interrupted once its successor's audio is fully
//! synthesized (so there's no dead air) and `MIN_DURATION` has elapsed (so a
//! message is never cut off before the user can register it).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use announcer_core::types::AudioConfig;

use crate::synthesizer::ReadyAudio;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const KILL_GRACE: Duration = Duration::from_millis(100);
const CHIME_MAX_DURATION: Duration = Duration::from_millis(250);

/// Locate the external audio player to shell out to. `None` means playback
/// is a no-op for this process lifetime (logged once by the caller).
pub fn discover_player() -> Option<Vec<String>> {
    if cfg!(target_os = "macos") {
        return which("afplay").map(|_| vec!["afplay".to_string()]);
    }

    for candidate in [&["mpv", "--no-terminal"][..], &["paplay"], &["aplay"]] {
        if which(candidate[0]).is_some() {
            return Some(candidate.iter().map(|s| s.to_string()).collect());
        }
    }
    None
}

fn which(bin: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn spawn(cmd: &[String], file: &Path) -> std::io::Result<Child> {
    Command::new(&cmd[0])
        .args(&cmd[1..])
        .arg(file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Terminate a child with SIGTERM, escalating to SIGKILL after `grace`.
#[cfg(unix)]
async fn terminate(child: &mut Child, grace: Duration) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else { return };
    if signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace: Duration) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}

/// Play a short file to completion, blocking this task but nothing else.
/// Used for the interrupt chime, which must finish before the successor starts.
async fn play_blocking(cmd: &[String], file: &Path, max_duration: Duration) {
    let mut child = match spawn(cmd, file) {
        Ok(c) => c,
        Err(error) => {
            warn!(%error, "failed to spawn chime player");
            return;
        }
    };
    match tokio::time::timeout(max_duration, child.wait()).await {
        Ok(_) => {}
        Err(_) => terminate(&mut child, KILL_GRACE).await,
    }
}

/// Spawn a short file to play fire-and-forget, reaped by a background task.
/// Used for the drop tone — it must never block the scheduler or the player.
pub fn play_fire_and_forget(cmd: Vec<String>, file: PathBuf) {
    tokio::spawn(async move {
        match spawn(&cmd, &file) {
            Ok(mut child) => {
                let _ = child.wait().await;
            }
            Err(error) => warn!(%error, "failed to spawn drop-tone player"),
        }
    });
}

/// Delete the WAV file of every `ReadyAudio` still buffered in the channel.
/// Called on shutdown so a backlog of synthesized-but-unplayed utterances
/// doesn't leak temp files — each one still has exactly one owner (this
/// function) at the moment it's drained.
async fn drain_ready_rx(ready_rx: &mut mpsc::Receiver<ReadyAudio>) {
    while let Ok(audio) = ready_rx.try_recv() {
        let _ = tokio::fs::remove_file(&audio.path).await;
    }
}

/// Drives the player loop until `shutdown` is signaled.
pub async fn run(
    ready_rx: mpsc::Receiver<ReadyAudio>,
    config: AudioConfig,
    chime: Option<(Vec<String>, PathBuf)>,
    shutdown: watch::Receiver<bool>,
) {
    let player_cmd = discover_player();
    if player_cmd.is_none() {
        warn!("no audio player executable found on PATH; playback will no-op");
    }
    run_with_player(ready_rx, config, chime, shutdown, player_cmd).await
}

/// Same as [`run`], but with the external player command injected rather
/// than discovered — lets tests drive the supervision loop with a real,
/// controllable child process instead of whatever happens to be on `$PATH`.
async fn run_with_player(
    mut ready_rx: mpsc::Receiver<ReadyAudio>,
    config: AudioConfig,
    chime: Option<(Vec<String>, PathBuf)>,
    mut shutdown: watch::Receiver<bool>,
    player_cmd: Option<Vec<String>>,
) {
    let mut next: Option<ReadyAudio> = None;

    loop {
        let audio = match next.take() {
            Some(a) => a,
            None => tokio::select! {
                got = ready_rx.recv() => match got {
                    Some(a) => a,
                    None => return,
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        drain_ready_rx(&mut ready_rx).await;
                        return;
                    }
                    continue;
                }
            },
        };

        let Some(cmd) = player_cmd.as_ref() else {
            let _ = tokio::fs::remove_file(&audio.path).await;
            continue;
        };

        let mut child = match spawn(cmd, &audio.path) {
            Ok(c) => c,
            Err(error) => {
                warn!(id = audio.id, %error, "failed to spawn audio player");
                let _ = tokio::fs::remove_file(&audio.path).await;
                continue;
            }
        };

        info!(id = audio.id, "playing utterance");
        let start = Instant::now();
        let mut interrupted_by: Option<ReadyAudio> = None;

        loop {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(_) => {}
                        Err(error) => warn!(id = audio.id, %error, "player wait failed"),
                    }
                    break;
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    if *shutdown.borrow() {
                        terminate(&mut child, KILL_GRACE).await;
                        let _ = tokio::fs::remove_file(&audio.path).await;
                        drain_ready_rx(&mut ready_rx).await;
                        return;
                    }

                    if config.interrupt && start.elapsed().as_secs_f32() >= config.min_duration {
                        if let Ok(successor) = ready_rx.try_recv() {
                            debug!(id = audio.id, successor = successor.id, "interrupting");
                            terminate(&mut child, KILL_GRACE).await;
                            if config.interrupt_chime {
                                if let Some((chime_cmd, chime_path)) = chime.as_ref() {
                                    play_blocking(chime_cmd, chime_path, CHIME_MAX_DURATION).await;
                                }
                            }
                            interrupted_by = Some(successor);
                            break;
                        }
                    }
                }
            }
        }

        let _ = tokio::fs::remove_file(&audio.path).await;
        next = interrupted_by;
    }
}
