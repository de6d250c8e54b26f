//! Synthesized instruments played through rodio.
//!
//! [`SynthInstrument`] is the stock [`Instrument`] implementation: an
//! oscillator with a configurable [`Waveform`], optional pitch quantization
//! and short attack/release ramps. Each played voice gets its own rodio
//! `Sink` and a monitor thread that reports the end of the voice.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use earcon::synth::{AudioOutput, SynthConfig, SynthInstrument, Waveform};
//! use earcon::{Instrument, PlayOptions};
//!
//! // The output must be kept alive for audio to play
//! let output = AudioOutput::try_default()?;
//!
//! let sine = SynthInstrument::new(output.handle(), SynthConfig::new(Waveform::Sine));
//! sine.play(
//!     PlayOptions::new()
//!         .frequency(660.0)
//!         .duration(Duration::from_millis(250))
//!         .on_end(|ended| println!("{} ended", ended.instrument)),
//! );
//! ```

mod source;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use earcon_core::PerfSpan;
use earcon_core::logging::{span_names, targets};

use crate::error::Result;
use crate::instrument::{
    EndCallback, Instrument, InstrumentId, ParamValue, PlayOptions, PlaybackEnded, StopReason,
};

pub use source::quantize_frequency;
use source::{ToneParams, ToneSource};

/// Default sample rate of synthesized voices in Hz.
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of volume steps used for a fade-out.
const FADE_STEPS: u32 = 20;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Pure tone.
    #[default]
    Sine,
    /// Hollow, odd harmonics.
    Square,
    /// Bright, all harmonics.
    Sawtooth,
    /// Mellow, odd harmonics falling off quickly.
    Triangle,
    /// Uniform white noise; frequency is ignored.
    WhiteNoise,
}

/// Pitch snapping applied to the voice frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrequencyQuantize {
    /// Play frequencies as given.
    #[default]
    None,
    /// Snap to the nearest equal-tempered semitone (A4 = 440 Hz).
    Chromatic,
    /// Snap to the nearest note of the C major scale.
    Major,
}

/// Configuration of a [`SynthInstrument`].
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Oscillator shape.
    pub waveform: Waveform,
    /// Pitch snapping.
    pub quantize: FrequencyQuantize,
    /// Frequency used when play options leave it unset.
    pub default_frequency: f64,
    /// Duration used when play options leave it unset.
    pub default_duration: Duration,
    /// Fade-in length at voice start.
    pub attack: Duration,
    /// Fade-out length before the natural end.
    pub release: Duration,
    /// Fade length used by a graceful stop without an explicit duration.
    pub stop_fade: Duration,
    /// How often the monitor thread checks for the natural end.
    pub poll_interval: Duration,
    /// Sample rate of generated audio.
    pub sample_rate: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            quantize: FrequencyQuantize::None,
            default_frequency: 440.0,
            default_duration: Duration::from_millis(500),
            attack: Duration::from_millis(5),
            release: Duration::from_millis(20),
            stop_fade: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SynthConfig {
    /// Create a configuration for a waveform with default settings.
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            ..Default::default()
        }
    }

    /// Set the pitch snapping.
    pub fn quantize(mut self, quantize: FrequencyQuantize) -> Self {
        self.quantize = quantize;
        self
    }

    /// Set the default frequency.
    pub fn default_frequency(mut self, frequency: f64) -> Self {
        self.default_frequency = frequency;
        self
    }

    /// Set the default duration.
    pub fn default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    /// Set the attack and release ramps.
    pub fn envelope(mut self, attack: Duration, release: Duration) -> Self {
        self.attack = attack;
        self.release = release;
        self
    }

    /// Set the default stop fade.
    pub fn stop_fade(mut self, fade: Duration) -> Self {
        self.stop_fade = fade;
        self
    }

    /// Set the monitor poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the sample rate.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }
}

/// A cloneable handle used by instruments to create playback sinks.
#[derive(Clone)]
pub struct OutputHandle {
    inner: OutputStreamHandle,
}

impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle").finish_non_exhaustive()
    }
}

/// The audio output device.
///
/// Owns the rodio output stream, which must stay alive for any instrument
/// using one of its handles to be heard. Keep it on the thread that created
/// it and hand [`OutputHandle`]s to instruments.
pub struct AudioOutput {
    /// The output stream (must be kept alive for audio to play).
    _stream: OutputStream,
    handle: OutputHandle,
}

impl AudioOutput {
    /// Open the default output device.
    ///
    /// Returns an error if no audio output device is available.
    pub fn try_default() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()?;
        tracing::debug!(target: targets::SYNTH, "audio output opened");
        Ok(Self {
            _stream: stream,
            handle: OutputHandle { inner: handle },
        })
    }

    /// A handle for creating instruments.
    pub fn handle(&self) -> OutputHandle {
        self.handle.clone()
    }
}

/// Command sent to a voice's monitor thread.
enum VoiceCommand {
    Stop {
        immediate: bool,
        fade: Option<Duration>,
        reason: StopReason,
    },
}

/// The voice currently owned by an instrument.
struct VoiceSlot {
    generation: u64,
    commands: Sender<VoiceCommand>,
}

/// A synthesized oscillator instrument.
///
/// One instance plays one voice at a time; playing again stops the previous
/// voice, and dropping the instrument stops its voice. Earcons play copies,
/// so every earcon voice has its own instance.
///
/// `on_end` runs exactly once per voice, on the voice's monitor thread, with
/// no stop reason for a natural end and with the stop reason otherwise.
pub struct SynthInstrument {
    id: InstrumentId,
    output: OutputHandle,
    config: SynthConfig,
    voice: Arc<Mutex<Option<VoiceSlot>>>,
    generation: AtomicU64,
}

impl SynthInstrument {
    /// Create an instrument playing through `output`.
    pub fn new(output: OutputHandle, config: SynthConfig) -> Self {
        Self {
            id: InstrumentId::next(),
            output,
            config,
            voice: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// The instrument configuration.
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Whether a voice is currently sounding.
    pub fn is_playing(&self) -> bool {
        self.voice.lock().is_some()
    }

    fn tone_params(&self, options: &PlayOptions) -> ToneParams {
        ToneParams {
            waveform: self.config.waveform,
            frequency: options
                .frequency
                .clone()
                .unwrap_or(ParamValue::Fixed(self.config.default_frequency)),
            min_frequency: options.min_frequency,
            max_frequency: options.max_frequency,
            quantize: self.config.quantize,
            volume: options.volume.clone().unwrap_or(ParamValue::Fixed(1.0)),
            pan: options.pan.unwrap_or(0.0),
            duration: options.duration.unwrap_or(self.config.default_duration),
            attack: self.config.attack,
            release: self.config.release,
            sample_rate: self.config.sample_rate,
        }
    }
}

impl Instrument for SynthInstrument {
    fn id(&self) -> InstrumentId {
        self.id
    }

    fn play(&self, options: PlayOptions) {
        if let Some(previous) = self.voice.lock().take() {
            let _ = previous.commands.send(VoiceCommand::Stop {
                immediate: true,
                fade: None,
                reason: StopReason::Custom("restarted".to_string()),
            });
        }

        let params = self.tone_params(&options);
        let on_end = options.on_end;

        let sink = match Sink::try_new(&self.output.inner) {
            Ok(sink) => sink,
            Err(err) => {
                tracing::error!(target: targets::SYNTH, instrument = %self.id, "failed to create sink: {err}");
                report_playback_failed(self.id, on_end.as_ref());
                return;
            }
        };

        tracing::trace!(
            target: targets::SYNTH,
            instrument = %self.id,
            waveform = ?params.waveform,
            duration_ms = params.duration.as_millis() as u64,
            "voice started"
        );
        sink.append(ToneSource::new(params));
        sink.play();

        let (commands, receiver) = unbounded();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        *self.voice.lock() = Some(VoiceSlot {
            generation,
            commands,
        });

        let monitor = VoiceMonitor {
            id: self.id,
            sink,
            receiver,
            generation,
            slot: self.voice.clone(),
            poll_interval: self.config.poll_interval,
            stop_fade: self.config.stop_fade,
            on_end: on_end.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name(format!("earcon-voice-{}", self.id.as_u64()))
            .spawn(move || monitor.run());
        if let Err(err) = spawned {
            // The monitor and its sink were dropped with the closure, which
            // silences the voice.
            tracing::error!(target: targets::SYNTH, instrument = %self.id, "failed to spawn voice monitor: {err}");
            *self.voice.lock() = None;
            report_playback_failed(self.id, on_end.as_ref());
        }
    }

    fn stop(&self, immediate: bool, fade: Option<Duration>, reason: StopReason) {
        let voice = self.voice.lock().as_ref().map(|slot| slot.commands.clone());
        match voice {
            Some(commands) => {
                let _ = commands.send(VoiceCommand::Stop {
                    immediate,
                    fade,
                    reason,
                });
            }
            None => {
                tracing::trace!(target: targets::SYNTH, instrument = %self.id, "stop without active voice");
            }
        }
    }

    fn copy(&self) -> Arc<dyn Instrument> {
        Arc::new(SynthInstrument::new(self.output.clone(), self.config.clone()))
    }
}

/// Report a voice that could not be started as ended.
fn report_playback_failed(id: InstrumentId, on_end: Option<&EndCallback>) {
    if let Some(on_end) = on_end {
        on_end(&PlaybackEnded::stopped(
            id,
            StopReason::Custom("playback failed".to_string()),
        ));
    }
}

/// State owned by a voice's monitor thread.
struct VoiceMonitor {
    id: InstrumentId,
    sink: Sink,
    receiver: Receiver<VoiceCommand>,
    /// Identifies this voice in the instrument's slot.
    generation: u64,
    slot: Arc<Mutex<Option<VoiceSlot>>>,
    poll_interval: Duration,
    stop_fade: Duration,
    on_end: Option<EndCallback>,
}

impl VoiceMonitor {
    fn run(self) {
        let _span = PerfSpan::new(span_names::VOICE);

        let ended = loop {
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(VoiceCommand::Stop {
                    immediate,
                    fade,
                    reason,
                }) => {
                    if !immediate {
                        self.fade_out(fade.unwrap_or(self.stop_fade));
                    }
                    self.sink.stop();
                    break PlaybackEnded::stopped(self.id, reason);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.sink.empty() {
                        break PlaybackEnded::finished(self.id);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.sink.stop();
                    break PlaybackEnded::stopped(
                        self.id,
                        StopReason::Custom("instrument dropped".to_string()),
                    );
                }
            }
        };

        {
            let mut slot = self.slot.lock();
            if slot.as_ref().is_some_and(|s| s.generation == self.generation) {
                *slot = None;
            }
        }

        tracing::trace!(target: targets::SYNTH, instrument = %self.id, reason = ?ended.reason, "voice ended");
        if let Some(on_end) = &self.on_end {
            on_end(&ended);
        }
    }

    /// Ramp the sink volume down to silence over `fade`.
    fn fade_out(&self, fade: Duration) {
        let start = self.sink.volume();
        let step = fade / FADE_STEPS;
        for i in 1..=FADE_STEPS {
            if self.sink.empty() {
                return;
            }
            self.sink
                .set_volume(start * (1.0 - i as f32 / FADE_STEPS as f32));
            std::thread::sleep(step);
        }
    }
}

static_assertions::assert_impl_all!(SynthInstrument: Send, Sync);
static_assertions::assert_impl_all!(OutputHandle: Send, Sync);
