//! Earcons: composite sound cues built from several instrument voices.
//!
//! An [`Earcon`] stores a list of `(instrument, play options)` pairs plus
//! master volume, pan and completion defaults. Every call to
//! [`sonify`](Earcon::sonify) starts a new playback episode: each configured
//! instrument is copied, registered as an active voice, and played. When the
//! episode is complete its completion callbacks run once.
//!
//! # Completion join
//!
//! With the default [`JoinMode::SharedDrain`], an episode counts as complete
//! when the earcon's table of active voices becomes empty. The table is shared
//! by every episode of the earcon, so when episodes overlap the callbacks of
//! an episode only run once the voices of *all* episodes have drained, and
//! only from the episode whose voice ended last. Episodes whose voices drained
//! earlier never report. A voice that never ends keeps the table non-empty and
//! blocks every later completion of this earcon.
//!
//! In both modes an episode cannot complete while `sonify` is still launching
//! its voices. A voice that ends during `play` is accounted for once the
//! launch loop is done.
//!
//! [`JoinMode::PerEpisode`] gives each episode its own countdown latch instead
//! and is the recommended mode for new integrations.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use earcon::{Earcon, EarconInstrument, EarconOptions, PlayOptions, SonifyOptions};
//!
//! let earcon = Earcon::with_registry(
//!     EarconOptions::new()
//!         .id("alert")
//!         .instrument(EarconInstrument::new(
//!             "sine",
//!             PlayOptions::new().frequency(880.0).duration(Duration::from_millis(150)),
//!         ))
//!         .instrument(EarconInstrument::new(
//!             "triangleMajor",
//!             PlayOptions::new().frequency(440.0).duration(Duration::from_millis(300)),
//!         ))
//!         .on_end(|_| println!("alert finished")),
//!     registry,
//! );
//!
//! earcon.sonify(Some(SonifyOptions::new().volume(0.5).pan(-1.0)));
//! // ... later
//! earcon.cancel_sonify(true);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use earcon_core::latch::{CountdownLatch, OnceFlag};
use earcon_core::logging::{span_names, targets};
use earcon_core::{ConnectionId, PerfSpan, Signal};

use crate::error::EarconError;
use crate::instrument::{
    EndCallback, Instrument, InstrumentId, InstrumentRef, ParamValue, PlayOptions, PlaybackEnded,
    StopReason,
};
use crate::registry::InstrumentRegistry;

/// How an episode decides that all of its voices have finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinMode {
    /// Complete when the earcon's shared voice table becomes empty.
    ///
    /// Exact for non-overlapping episodes. Overlapping episodes share the
    /// emptiness check; see the module documentation.
    #[default]
    SharedDrain,
    /// Complete when every voice launched by this episode has ended.
    PerEpisode,
}

/// What happens to the completion callbacks of voices stopped by
/// [`Earcon::cancel_sonify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Callbacks run if and when the instrument reports the stopped voice
    /// as ended. Cancelling does not by itself suppress completion.
    #[default]
    Passthrough,
    /// Cancelled voices are marked, and their callbacks become no-ops.
    Suppress,
}

/// One configured instrument of an earcon.
#[derive(Clone, Debug)]
pub struct EarconInstrument {
    /// The instrument, by name or instance.
    pub instrument: InstrumentRef,
    /// Options for playing it. A pair without options is reported and skipped.
    pub play_options: Option<PlayOptions>,
}

impl EarconInstrument {
    /// Create a pair.
    pub fn new(instrument: impl Into<InstrumentRef>, play_options: PlayOptions) -> Self {
        Self {
            instrument: instrument.into(),
            play_options: Some(play_options),
        }
    }

    /// Create a pair without play options.
    pub fn without_options(instrument: impl Into<InstrumentRef>) -> Self {
        Self {
            instrument: instrument.into(),
            play_options: None,
        }
    }
}

/// Stored configuration of an earcon.
#[derive(Clone, Default)]
pub struct EarconOptions {
    /// Unique identifier. Generated when unset.
    pub id: Option<String>,
    /// Instruments played by each episode, in launch order.
    pub instruments: Vec<EarconInstrument>,
    /// Master volume, 0 to 1. Defaults to 1.
    pub volume: Option<f64>,
    /// Master pan, -1 to 1. When unset each instrument keeps its own pan.
    pub pan: Option<f64>,
    /// Invoked when an episode completes.
    pub on_end: Option<EndCallback>,
    /// Completion join strategy.
    pub join_mode: JoinMode,
    /// Completion behavior of cancelled voices.
    pub cancel_policy: CancelPolicy,
}

impl EarconOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append an instrument pair.
    pub fn instrument(mut self, instrument: EarconInstrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    /// Replace the instrument list.
    pub fn instruments(mut self, instruments: Vec<EarconInstrument>) -> Self {
        self.instruments = instruments;
        self
    }

    /// Set the master volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Set the master pan.
    pub fn pan(mut self, pan: f64) -> Self {
        self.pan = Some(pan);
        self
    }

    /// Set the master completion callback.
    pub fn on_end<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PlaybackEnded) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(callback));
        self
    }

    /// Set the join mode.
    pub fn join_mode(mut self, mode: JoinMode) -> Self {
        self.join_mode = mode;
        self
    }

    /// Set the cancel policy.
    pub fn cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }
}

impl fmt::Debug for EarconOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EarconOptions")
            .field("id", &self.id)
            .field("instruments", &self.instruments)
            .field("volume", &self.volume)
            .field("pan", &self.pan)
            .field("on_end", &self.on_end.is_some())
            .field("join_mode", &self.join_mode)
            .field("cancel_policy", &self.cancel_policy)
            .finish()
    }
}

/// Per-call overrides for [`Earcon::sonify`].
///
/// Set fields win over the stored options. An `instruments` list replaces the
/// stored list entirely.
#[derive(Clone, Default)]
pub struct SonifyOptions {
    /// Replacement instrument list.
    pub instruments: Option<Vec<EarconInstrument>>,
    /// Master volume for this episode.
    pub volume: Option<f64>,
    /// Master pan for this episode.
    pub pan: Option<f64>,
    /// Invoked when this episode completes, before the stored callback.
    pub on_end: Option<EndCallback>,
}

impl SonifyOptions {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the instrument list.
    pub fn instruments(mut self, instruments: Vec<EarconInstrument>) -> Self {
        self.instruments = Some(instruments);
        self
    }

    /// Override the master volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Override the master pan.
    pub fn pan(mut self, pan: f64) -> Self {
        self.pan = Some(pan);
        self
    }

    /// Set the episode completion callback.
    pub fn on_end<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PlaybackEnded) + Send + Sync + 'static,
    {
        self.on_end = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for SonifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonifyOptions")
            .field("instruments", &self.instruments)
            .field("volume", &self.volume)
            .field("pan", &self.pan)
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

/// Outcome of one [`Earcon::sonify`] call.
#[derive(Debug, Clone, Default)]
pub struct SonifyReport {
    /// Sequence number of the episode within its earcon.
    pub episode: u64,
    /// Voices launched, in launch order.
    pub launched: Vec<InstrumentId>,
    /// Pairs that could not be launched.
    pub errors: Vec<EarconError>,
}

impl SonifyReport {
    /// Whether every configured pair was launched.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of voices launched.
    pub fn launched_count(&self) -> usize {
        self.launched.len()
    }
}

/// A voice registered in the active table.
struct ActiveVoice {
    instrument: Arc<dyn Instrument>,
    suppressed: Arc<AtomicBool>,
}

/// State shared between an earcon and the callbacks of its voices.
struct EarconShared {
    id: String,
    /// Active voices keyed by copy ID. IDs are allocated in increasing order,
    /// so iteration follows launch order.
    playing: Mutex<BTreeMap<InstrumentId, ActiveVoice>>,
    finished: Signal<PlaybackEnded>,
    error: Signal<EarconError>,
}

impl EarconShared {
    /// Remove a voice and report whether the table is now empty.
    ///
    /// Removal and the emptiness check happen under one lock so that exactly
    /// one ending voice observes the drain.
    fn remove_voice(&self, id: InstrumentId) -> bool {
        let mut playing = self.playing.lock();
        playing.remove(&id);
        playing.is_empty()
    }

    fn is_drained(&self) -> bool {
        self.playing.lock().is_empty()
    }
}

/// Launch phase bookkeeping of a shared-drain episode.
struct LaunchState {
    launching: bool,
    /// The voice end that drained the table while the episode was still
    /// launching.
    pending: Option<PlaybackEnded>,
}

/// Join state of one episode.
enum EpisodeJoin {
    SharedDrain {
        fired: OnceFlag,
        launch: Mutex<LaunchState>,
    },
    PerEpisode {
        latch: CountdownLatch,
        last_ended: Mutex<Option<PlaybackEnded>>,
    },
}

/// One `sonify` call.
struct Episode {
    number: u64,
    episode_on_end: Option<EndCallback>,
    master_on_end: Option<EndCallback>,
    join: EpisodeJoin,
}

impl Episode {
    fn new(
        number: u64,
        mode: JoinMode,
        episode_on_end: Option<EndCallback>,
        master_on_end: Option<EndCallback>,
    ) -> Self {
        let join = match mode {
            JoinMode::SharedDrain => EpisodeJoin::SharedDrain {
                fired: OnceFlag::new(),
                launch: Mutex::new(LaunchState {
                    launching: true,
                    pending: None,
                }),
            },
            // One guard count held for the launch phase.
            JoinMode::PerEpisode => EpisodeJoin::PerEpisode {
                latch: CountdownLatch::new(1),
                last_ended: Mutex::new(None),
            },
        };
        Self {
            number,
            episode_on_end,
            master_on_end,
            join,
        }
    }

    /// Account for a voice about to be launched.
    fn voice_launched(&self) {
        if let EpisodeJoin::PerEpisode { latch, .. } = &self.join {
            latch.arm(1);
        }
    }

    /// Handle the end of one of this episode's voices.
    fn voice_ended(&self, shared: &EarconShared, drained: bool, ended: &PlaybackEnded) {
        match &self.join {
            EpisodeJoin::SharedDrain { fired, launch } => {
                if !drained {
                    return;
                }
                {
                    let mut launch = launch.lock();
                    if launch.launching {
                        // Later pairs may still be launched.
                        launch.pending = Some(ended.clone());
                        return;
                    }
                }
                if fired.claim() {
                    self.complete(shared, ended);
                }
            }
            EpisodeJoin::PerEpisode { latch, last_ended } => {
                *last_ended.lock() = Some(ended.clone());
                if latch.count_down() {
                    self.complete(shared, ended);
                }
            }
        }
    }

    /// Close the launch phase.
    fn launch_finished(&self, shared: &EarconShared) {
        match &self.join {
            EpisodeJoin::SharedDrain { fired, launch } => {
                let pending = {
                    let mut launch = launch.lock();
                    launch.launching = false;
                    launch.pending.take()
                };
                // A drain seen during launch only counts if nothing was
                // launched after it.
                if let Some(ended) = pending {
                    if shared.is_drained() && fired.claim() {
                        self.complete(shared, &ended);
                    }
                }
            }
            EpisodeJoin::PerEpisode { latch, last_ended } => {
                if latch.release() {
                    // Every voice ended during the launch phase, or none launched.
                    let last = last_ended.lock().clone();
                    if let Some(ended) = last {
                        self.complete(shared, &ended);
                    }
                }
            }
        }
    }

    fn complete(&self, shared: &EarconShared, ended: &PlaybackEnded) {
        tracing::debug!(
            target: targets::PLAYBACK,
            earcon = %shared.id,
            episode = self.number,
            last_voice = %ended.instrument,
            "episode complete"
        );
        if let Some(on_end) = &self.episode_on_end {
            on_end(ended);
        }
        if let Some(on_end) = &self.master_on_end {
            on_end(ended);
        }
        shared.finished.emit(ended.clone());
    }
}

/// Generate a process-wide unique earcon ID.
fn generate_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("earcon-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Combine per-instrument play options with the episode's master settings.
///
/// A fixed (or absent) volume is scaled by `master_volume`; a dynamic volume
/// is left for the instrument to evaluate. A defined `master_pan` replaces
/// the instrument pan.
pub(crate) fn merge_play_options(
    options: &PlayOptions,
    master_volume: f64,
    master_pan: Option<f64>,
) -> PlayOptions {
    let mut merged = options.clone();
    merged.volume = Some(match &options.volume {
        Some(dynamic @ ParamValue::Dynamic(_)) => dynamic.clone(),
        Some(ParamValue::Fixed(volume)) => ParamValue::Fixed(master_volume * volume),
        None => ParamValue::Fixed(master_volume),
    });
    if let Some(pan) = master_pan {
        merged.pan = Some(pan);
    }
    merged
}

/// A named, reusable composite sound cue.
///
/// `Earcon` is `Send + Sync`; share it behind an `Arc` to trigger it from
/// several places or from inside its own callbacks.
///
/// # Signals
///
/// - `finished`: Emitted with the last voice's [`PlaybackEnded`] whenever an
///   episode completes, after the episode and master callbacks.
/// - `error`: Emitted for every configured pair that could not be launched.
pub struct Earcon {
    id: String,
    options: EarconOptions,
    registry: Arc<InstrumentRegistry>,
    shared: Arc<EarconShared>,
    episode_counter: AtomicU64,
}

impl Earcon {
    /// Create an earcon with an empty instrument registry.
    ///
    /// Only instance references can be resolved; name references are
    /// reported as unresolved.
    pub fn new(options: EarconOptions) -> Self {
        Self::with_registry(options, Arc::new(InstrumentRegistry::new()))
    }

    /// Create an earcon that resolves instrument names through `registry`.
    pub fn with_registry(mut options: EarconOptions, registry: Arc<InstrumentRegistry>) -> Self {
        let id = match &options.id {
            Some(id) => id.clone(),
            None => {
                let id = generate_id();
                options.id = Some(id.clone());
                id
            }
        };

        tracing::debug!(
            target: targets::PLAYBACK,
            earcon = %id,
            instruments = options.instruments.len(),
            "earcon created"
        );

        Self {
            shared: Arc::new(EarconShared {
                id: id.clone(),
                playing: Mutex::new(BTreeMap::new()),
                finished: Signal::new(),
                error: Signal::new(),
            }),
            id,
            options,
            registry,
            episode_counter: AtomicU64::new(0),
        }
    }

    /// The earcon's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The stored options, including the generated ID.
    pub fn options(&self) -> &EarconOptions {
        &self.options
    }

    /// The registry used to resolve instrument names.
    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        &self.registry
    }

    /// Number of voices currently registered as playing.
    pub fn active_voice_count(&self) -> usize {
        self.shared.playing.lock().len()
    }

    /// IDs of the voices currently registered as playing, in launch order.
    pub fn active_voice_ids(&self) -> Vec<InstrumentId> {
        self.shared.playing.lock().keys().copied().collect()
    }

    /// Whether any voice is registered as playing.
    pub fn is_playing(&self) -> bool {
        !self.shared.playing.lock().is_empty()
    }

    /// Play the earcon.
    ///
    /// Launches one copy of every configured instrument and returns without
    /// waiting. Pairs whose instrument cannot be resolved or that carry no
    /// play options are reported and skipped; the rest still play.
    ///
    /// The episode callback (`overrides.on_end`) and the stored master
    /// callback each run at most once, after the episode completes according
    /// to the configured [`JoinMode`].
    pub fn sonify(&self, overrides: Option<SonifyOptions>) -> SonifyReport {
        let _span = PerfSpan::new(span_names::SONIFY);
        let overrides = overrides.unwrap_or_default();

        let master_volume = overrides.volume.or(self.options.volume).unwrap_or(1.0);
        let master_pan = overrides.pan.or(self.options.pan);
        let instruments = overrides
            .instruments
            .as_ref()
            .unwrap_or(&self.options.instruments);

        let number = self.episode_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let episode = Arc::new(Episode::new(
            number,
            self.options.join_mode,
            overrides.on_end.clone(),
            self.options.on_end.clone(),
        ));

        tracing::debug!(
            target: targets::PLAYBACK,
            earcon = %self.id,
            episode = number,
            instruments = instruments.len(),
            master_volume,
            ?master_pan,
            "sonify"
        );

        let mut report = SonifyReport {
            episode: number,
            ..Default::default()
        };

        for (index, pair) in instruments.iter().enumerate() {
            match self.resolve(index, pair) {
                Ok((template, play_options)) => {
                    let merged = merge_play_options(play_options, master_volume, master_pan);
                    let id = self.launch(&episode, template.as_ref(), merged);
                    report.launched.push(id);
                }
                Err(err) => {
                    tracing::warn!(
                        target: targets::PLAYBACK,
                        earcon = %self.id,
                        code = err.code(),
                        "{err}"
                    );
                    self.shared.error.emit(err.clone());
                    report.errors.push(err);
                }
            }
        }

        episode.launch_finished(&self.shared);
        report
    }

    /// Stop every voice registered as playing.
    ///
    /// Each voice is stopped with `immediate = !fade_out`, no fade duration
    /// and [`StopReason::Cancelled`]. Once every voice has been asked to
    /// stop, the voices are removed from the table before this returns,
    /// whether or not the instruments have finished stopping. Voices added by
    /// a concurrent `sonify` are left alone.
    ///
    /// Returns the number of voices stopped.
    pub fn cancel_sonify(&self, fade_out: bool) -> usize {
        let _span = PerfSpan::new(span_names::CANCEL);

        // Instruments may report their end synchronously from `stop`, which
        // re-locks the table, so they are stopped from a snapshot.
        let voices: Vec<(InstrumentId, Arc<dyn Instrument>, Arc<AtomicBool>)> = self
            .shared
            .playing
            .lock()
            .iter()
            .map(|(id, voice)| (*id, voice.instrument.clone(), voice.suppressed.clone()))
            .collect();
        if voices.is_empty() {
            tracing::trace!(target: targets::PLAYBACK, earcon = %self.id, "nothing to cancel");
            return 0;
        }

        tracing::debug!(
            target: targets::PLAYBACK,
            earcon = %self.id,
            voices = voices.len(),
            fade_out,
            "cancelling"
        );

        if self.options.cancel_policy == CancelPolicy::Suppress {
            for (_, _, suppressed) in &voices {
                suppressed.store(true, Ordering::Release);
            }
        }

        for (_, instrument, _) in &voices {
            instrument.stop(!fade_out, None, StopReason::Cancelled);
        }

        {
            let mut playing = self.shared.playing.lock();
            for (id, _, _) in &voices {
                playing.remove(id);
            }
        }
        voices.len()
    }

    /// Connect a callback to the finished signal.
    pub fn on_finished<F>(&self, callback: F) -> ConnectionId
    where
        F: Fn(&PlaybackEnded) + Send + Sync + 'static,
    {
        self.shared.finished.connect(callback)
    }

    /// Disconnect a finished callback.
    pub fn disconnect_finished(&self, id: ConnectionId) -> bool {
        self.shared.finished.disconnect(id)
    }

    /// Connect a callback to the error signal.
    pub fn on_error<F>(&self, callback: F) -> ConnectionId
    where
        F: Fn(&EarconError) + Send + Sync + 'static,
    {
        self.shared.error.connect(callback)
    }

    /// Disconnect an error callback.
    pub fn disconnect_error(&self, id: ConnectionId) -> bool {
        self.shared.error.disconnect(id)
    }

    /// Resolve the instrument of a pair and check it has play options.
    fn resolve<'a>(
        &self,
        index: usize,
        pair: &'a EarconInstrument,
    ) -> Result<(Arc<dyn Instrument>, &'a PlayOptions), EarconError> {
        let instrument = match &pair.instrument {
            InstrumentRef::Instance(instrument) => instrument.clone(),
            InstrumentRef::Name(name) => self
                .registry
                .get(name)
                .ok_or_else(|| EarconError::unresolved(&self.id, index, name))?,
        };

        let play_options = pair
            .play_options
            .as_ref()
            .ok_or_else(|| EarconError::missing_play_options(&self.id, index))?;

        Ok((instrument, play_options))
    }

    /// Copy, register and play one voice.
    fn launch(
        &self,
        episode: &Arc<Episode>,
        template: &dyn Instrument,
        mut options: PlayOptions,
    ) -> InstrumentId {
        let copy = template.copy();
        let copy_id = copy.id();
        let suppressed = Arc::new(AtomicBool::new(false));

        let on_end = options.on_end.take();
        let shared = self.shared.clone();
        let voice_episode = episode.clone();
        let voice_suppressed = suppressed.clone();
        let voice_ended = OnceFlag::new();

        options.on_end = Some(Arc::new(move |ended: &PlaybackEnded| {
            if voice_suppressed.load(Ordering::Acquire) {
                tracing::trace!(target: targets::PLAYBACK, voice = %copy_id, "suppressed end of cancelled voice");
                return;
            }
            if !voice_ended.claim() {
                tracing::trace!(target: targets::PLAYBACK, voice = %copy_id, "duplicate end ignored");
                return;
            }

            let drained = shared.remove_voice(copy_id);
            tracing::trace!(
                target: targets::PLAYBACK,
                earcon = %shared.id,
                voice = %copy_id,
                reason = ?ended.reason,
                drained,
                "voice ended"
            );

            if let Some(on_end) = &on_end {
                on_end(ended);
            }
            voice_episode.voice_ended(&shared, drained, ended);
        }));

        episode.voice_launched();
        self.shared.playing.lock().insert(
            copy_id,
            ActiveVoice {
                instrument: copy.clone(),
                suppressed,
            },
        );

        tracing::trace!(
            target: targets::PLAYBACK,
            earcon = %self.id,
            episode = episode.number,
            voice = %copy_id,
            template = %template.id(),
            "launching voice"
        );
        copy.play(options);
        copy_id
    }
}

impl fmt::Debug for Earcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Earcon")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("active_voices", &self.active_voice_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(Earcon: Send, Sync);
