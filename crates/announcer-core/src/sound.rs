//! Procedural synthesis of the interrupt chime and drop tone.
//!
//! Pure math — no I/O. Ported note-for-note from the reference Python
//! implementation's envelope shapes so the two sounds stay recognizable.

use std::f32::consts::PI;

const DEFAULT_SAMPLE_RATE: u32 = 24_000;

fn linspace(duration: f32, sample_rate: u32) -> Vec<f32> {
    let n = (sample_rate as f32 * duration) as usize;
    if n == 0 {
        return Vec::new();
    }
    let step = duration / n as f32;
    (0..n).map(|i| i as f32 * step).collect()
}

fn make_chime_note(freq: f32, duration: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let t = linspace(duration, sample_rate);
    let n = t.len();
    let mut note: Vec<f32> = t
        .iter()
        .map(|&ti| {
            amplitude * (2.0 * PI * freq * ti).sin()
                + amplitude * 0.3 * (2.0 * PI * freq * 2.0 * ti).sin()
                + amplitude * 0.1 * (2.0 * PI * freq * 3.0 * ti).sin()
        })
        .collect();

    let attack = (n as f32 * 0.05) as usize;
    for (i, ti) in t.iter().enumerate() {
        let mut envelope = (-ti * 8.0).exp();
        if i < attack && attack > 0 {
            envelope *= i as f32 / attack as f32;
        }
        note[i] *= envelope;
    }
    note
}

/// Two-note interrupt chime: G5 -> gap -> C6.
pub fn generate_chime(sample_rate: u32) -> Vec<f32> {
    let note1 = make_chime_note(784.0, 0.08, 0.25, sample_rate);
    let note2 = make_chime_note(1047.0, 0.08, 0.25, sample_rate);
    let gap = vec![0.0f32; (sample_rate as f32 * 0.03) as usize];

    let mut chime = Vec::with_capacity(note1.len() + gap.len() + note2.len());
    chime.extend(note1);
    chime.extend(gap);
    chime.extend(note2);

    let fade = (sample_rate as f32 * 0.02) as usize;
    let len = chime.len();
    if fade > 0 && fade <= len {
        for i in 0..fade {
            chime[len - fade + i] *= 1.0 - (i as f32 / fade as f32);
        }
    }

    chime
}

/// Soft single-pluck tone used to mark a dropped message.
pub fn generate_drop_tone(sample_rate: u32) -> Vec<f32> {
    let duration = 0.15;
    let t = linspace(duration, sample_rate);
    let n = t.len();
    let freq = 659.0;

    let mut tone: Vec<f32> = t
        .iter()
        .map(|&ti| {
            (2.0 * PI * freq * ti).sin()
                + 0.5 * (2.0 * PI * freq * 2.0 * ti).sin() * (-ti * 20.0).exp()
                + 0.25 * (2.0 * PI * freq * 3.0 * ti).sin() * (-ti * 30.0).exp()
                + 0.1 * (2.0 * PI * freq * 4.0 * ti).sin() * (-ti * 40.0).exp()
        })
        .collect();

    let attack_samples = (sample_rate as f32 * 0.005) as usize;
    for (i, ti) in t.iter().enumerate() {
        let envelope = if i < attack_samples && attack_samples > 0 {
            i as f32 / attack_samples as f32
        } else {
            (-ti * 10.0).exp()
        };
        tone[i] *= envelope * 0.18;
    }

    let fade = (sample_rate as f32 * 0.03) as usize;
    if fade > 0 && fade <= n {
        for i in 0..fade {
            tone[n - fade + i] *= 1.0 - (i as f32 / fade as f32);
        }
    }

    tone
}

/// Sample rate the chime and drop tone are generated at when no override is given.
pub fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_duration_in_expected_range() {
        let chime = generate_chime(DEFAULT_SAMPLE_RATE);
        let secs = chime.len() as f32 / DEFAULT_SAMPLE_RATE as f32;
        assert!(secs > 0.15 && secs < 0.25, "secs={secs}");
    }

    #[test]
    fn chime_peak_amplitude_bounded() {
        let chime = generate_chime(DEFAULT_SAMPLE_RATE);
        let peak = chime.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 1.0, "peak={peak}");
    }

    #[test]
    fn chime_is_nonempty() {
        assert!(!generate_chime(DEFAULT_SAMPLE_RATE).is_empty());
    }

    #[test]
    fn drop_tone_duration_in_expected_range() {
        let tone = generate_drop_tone(DEFAULT_SAMPLE_RATE);
        let secs = tone.len() as f32 / DEFAULT_SAMPLE_RATE as f32;
        assert!(secs > 0.10 && secs < 0.20, "secs={secs}");
    }

    #[test]
    fn drop_tone_peak_amplitude_bounded() {
        let tone = generate_drop_tone(DEFAULT_SAMPLE_RATE);
        let peak = tone.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 1.0, "peak={peak}");
    }

    #[test]
    fn chime_fades_to_near_silence() {
        let chime = generate_chime(DEFAULT_SAMPLE_RATE);
        let last = *chime.last().unwrap();
        assert!(last.abs() < 0.05, "last={last}");
    }
}
