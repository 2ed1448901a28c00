//! Generates and persists the interrupt chime and drop tone as temporary WAV
//! files, and cleans them up on shutdown.

use std::path::PathBuf;

use announcer_core::sound::{default_sample_rate, generate_chime, generate_drop_tone};
use announcer_core::wav::write_wav_f32;

/// The two procedurally-generated sound effects, persisted to disk for the
/// process lifetime.
pub struct SoundAssets {
    pub chime_path: PathBuf,
    pub drop_path: PathBuf,
}

impl SoundAssets {
    /// Synthesize and write both sound effects to the OS temp directory.
    pub fn generate() -> std::io::Result<Self> {
        let sample_rate = default_sample_rate();

        let chime_wav = write_wav_f32(&generate_chime(sample_rate), sample_rate);
        let chime_path = write_temp_wav("announcer-chime-", &chime_wav)?;

        let drop_wav = write_wav_f32(&generate_drop_tone(sample_rate), sample_rate);
        let drop_path = write_temp_wav("announcer-drop-", &drop_wav)?;

        Ok(Self {
            chime_path,
            drop_path,
        })
    }

    /// Delete both sound files. Safe to call more than once.
    pub fn cleanup(&self) {
        for path in [&self.chime_path, &self.drop_path] {
            if let Err(error) = std::fs::remove_file(path) {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(?path, %error, "failed to remove sound asset");
                }
            }
        }
    }
}

fn write_temp_wav(prefix: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let tmp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".wav")
        .tempfile()?;
    std::fs::write(tmp.path(), bytes)?;
    let (_, path) = tmp.keep()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_both_files_on_disk() {
        let assets = SoundAssets::generate().unwrap();
        assert!(assets.chime_path.exists());
        assert!(assets.drop_path.exists());
        let chime_bytes = std::fs::read(&assets.chime_path).unwrap();
        assert_eq!(&chime_bytes[0..4], b"RIFF");
        assets.cleanup();
        assert!(!assets.chime_path.exists());
        assert!(!assets.drop_path.exists());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let assets = SoundAssets::generate().unwrap();
        assets.cleanup();
        assets.cleanup();
    }
}
