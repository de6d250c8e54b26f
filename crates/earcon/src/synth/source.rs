//! Sample generation for synthesized voices.

use std::f64::consts::{FRAC_PI_4, TAU};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::Source;

use crate::instrument::ParamValue;

use super::{FrequencyQuantize, Waveform};

/// Frequency of A4 in Hz, the tuning reference.
const A4_FREQUENCY: f64 = 440.0;
/// MIDI note number of A4.
const A4_MIDI: f64 = 69.0;
/// Pitch classes of the C major scale.
const MAJOR_PITCH_CLASSES: [i64; 7] = [0, 2, 4, 5, 7, 9, 11];

fn frequency_to_midi(frequency: f64) -> f64 {
    A4_MIDI + 12.0 * (frequency / A4_FREQUENCY).log2()
}

fn midi_to_frequency(midi: f64) -> f64 {
    A4_FREQUENCY * 2f64.powf((midi - A4_MIDI) / 12.0)
}

/// Snap a frequency according to `quantize`.
///
/// Non-positive frequencies are returned unchanged.
pub fn quantize_frequency(frequency: f64, quantize: FrequencyQuantize) -> f64 {
    if frequency <= 0.0 || !frequency.is_finite() {
        return frequency;
    }

    match quantize {
        FrequencyQuantize::None => frequency,
        FrequencyQuantize::Chromatic => midi_to_frequency(frequency_to_midi(frequency).round()),
        FrequencyQuantize::Major => {
            let midi = frequency_to_midi(frequency);
            let nearest = midi.round() as i64;
            let snapped = if MAJOR_PITCH_CLASSES.contains(&nearest.rem_euclid(12)) {
                nearest
            } else {
                // Both neighbours of a pitch class outside the scale are in it.
                if midi < nearest as f64 { nearest - 1 } else { nearest + 1 }
            };
            midi_to_frequency(snapped as f64)
        }
    }
}

/// Parameters of one synthesized voice.
#[derive(Debug, Clone)]
pub(crate) struct ToneParams {
    pub waveform: Waveform,
    pub frequency: ParamValue,
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
    pub quantize: FrequencyQuantize,
    pub volume: ParamValue,
    pub pan: f64,
    pub duration: Duration,
    pub attack: Duration,
    pub release: Duration,
    pub sample_rate: u32,
}

/// A stereo tone that evaluates frequency and volume per frame.
pub(crate) struct ToneSource {
    params: ToneParams,
    total_frames: u64,
    frame: u64,
    /// Right-channel sample of the current frame, pending output.
    pending_right: Option<f32>,
    phase: f64,
    rng: StdRng,
}

impl ToneSource {
    pub fn new(params: ToneParams) -> Self {
        let total_frames =
            (params.duration.as_secs_f64() * f64::from(params.sample_rate)).round() as u64;
        Self {
            params,
            total_frames,
            frame: 0,
            pending_right: None,
            phase: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    fn frequency_at(&self, elapsed: Duration) -> f64 {
        let mut frequency = self.params.frequency.value_at(elapsed);
        if let Some(min) = self.params.min_frequency {
            frequency = frequency.max(min);
        }
        if let Some(max) = self.params.max_frequency {
            frequency = frequency.min(max);
        }
        quantize_frequency(frequency, self.params.quantize)
    }

    /// Linear attack and release ramps.
    fn envelope_at(&self, elapsed: Duration) -> f64 {
        let attack = self.params.attack.as_secs_f64();
        let release = self.params.release.as_secs_f64();
        let t = elapsed.as_secs_f64();
        let remaining = self.params.duration.as_secs_f64() - t;

        let mut gain: f64 = 1.0;
        if attack > 0.0 && t < attack {
            gain = gain.min(t / attack);
        }
        if release > 0.0 && remaining < release {
            gain = gain.min(remaining.max(0.0) / release);
        }
        gain
    }

    fn oscillator(&mut self) -> f64 {
        match self.params.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
            Waveform::WhiteNoise => self.rng.gen_range(-1.0..=1.0),
        }
    }

    /// Produce the left and right samples of the current frame.
    fn next_frame(&mut self) -> (f32, f32) {
        let sample_rate = f64::from(self.params.sample_rate);
        let elapsed = Duration::from_secs_f64(self.frame as f64 / sample_rate);

        let value = self.oscillator();
        self.phase = (self.phase + self.frequency_at(elapsed) / sample_rate).rem_euclid(1.0);

        let amplitude =
            self.params.volume.value_at(elapsed).clamp(0.0, 1.0) * self.envelope_at(elapsed);
        let (left, right) = pan_gains(self.params.pan);
        let sample = value * amplitude;
        ((sample * left) as f32, (sample * right) as f32)
    }
}

/// Equal-power gains for a pan position in `[-1, 1]`.
pub(crate) fn pan_gains(pan: f64) -> (f64, f64) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if let Some(right) = self.pending_right.take() {
            self.frame += 1;
            return Some(right);
        }
        if self.frame >= self.total_frames {
            return None;
        }
        let (left, right) = self.next_frame();
        self.pending_right = Some(right);
        Some(left)
    }
}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.params.duration)
    }
}
