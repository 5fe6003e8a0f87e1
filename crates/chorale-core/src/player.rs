//! The playback transport.
//!
//! [`Player`] owns the externally visible play/pause/resume/stop/seek
//! contract. Internally it is built around a single cross-cutting
//! invariant: every command that invalidates in-flight work allocates a new
//! *generation*, and any blocking step (clock bring-up, backend load) is
//! followed by a generation re-check before further state mutation. Stale
//! continuations, position trackers and auto-stop timers all compare their
//! captured generation against the current one and wind down silently when
//! superseded: a later command wins by allocating, not by preempting.
//!
//! Two independent paths end playback at the end of the timeline: the
//! position tracker (which can stall if the host starves its thread) and a
//! wall-clock backstop timer. Both are idempotent and generation-checked.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::clock::AudioClock;
use crate::context::PlaybackContext;
use crate::error::PlaybackError;
use crate::events::EventData;
use crate::scheduler;
use crate::timing::{seconds_to_ticks, ticks_to_seconds};

/// Position tracker polling interval.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Wall-clock margin added to the auto-stop backstop timer.
const AUTO_STOP_MARGIN: f64 = 0.5;

/// Scheduling-jitter slack before the tracker declares the end reached.
const END_SLACK: f64 = 0.1;

/// Externally visible transport state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// Nothing playing, position at zero.
    Stopped,
    /// Notes scheduled, position advancing.
    Playing,
    /// Frozen mid-timeline with a cached session to resume from.
    Paused,
}

/// Notifications published on the transport event channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// Playback (re)started from the given tick.
    Started {
        /// Tick offset playback started from.
        from_tick: u64,
    },
    /// Playback paused at the given tick.
    Paused {
        /// Tick recorded for resume.
        at_tick: u64,
    },
    /// Playback stopped by command.
    Stopped,
    /// Playback reached the end of the timeline.
    Finished,
}

/// Session state guarded by the session mutex.
struct Session {
    state: TransportState,
    bpm: f64,
    clock_anchor: f64,
    paused_tick: u64,
    duration_ticks: u64,
    timeline: Option<Arc<EventData>>,
    instrument: String,
}

impl Session {
    fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            bpm: 100.0,
            clock_anchor: 0.0,
            paused_tick: 0,
            duration_ticks: 0,
            timeline: None,
            instrument: "organ".to_string(),
        }
    }
}

struct PlayerShared {
    ctx: Arc<PlaybackContext>,
    /// Monotonically increasing command tag; the sole cancellation
    /// mechanism for in-flight work.
    generation: AtomicU64,
    current_tick: AtomicU64,
    loading: AtomicBool,
    /// Serializes the synchronous section of each command. Never held
    /// across a blocking load or clock bring-up.
    commands: Mutex<()>,
    session: Mutex<Session>,
    event_tx: Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
}

/// A cheaply cloneable handle to one playback transport.
///
/// All methods take `&self`; clones share the same transport. The shared
/// [`PlaybackContext`] supplies the audio clock and backend cache.
#[derive(Clone)]
pub struct Player {
    shared: Arc<PlayerShared>,
}

impl Player {
    /// Create a transport over the given context.
    pub fn new(ctx: Arc<PlaybackContext>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            shared: Arc::new(PlayerShared {
                ctx,
                generation: AtomicU64::new(0),
                current_tick: AtomicU64::new(0),
                loading: AtomicBool::new(false),
                commands: Mutex::new(()),
                session: Mutex::new(Session::new()),
                event_tx,
                event_rx,
            }),
        }
    }

    /// Receiver for transport notifications.
    ///
    /// Every clone of the receiver sees every event; the channel is
    /// unbounded and never blocks the transport.
    pub fn events(&self) -> Receiver<TransportEvent> {
        self.shared.event_rx.clone()
    }

    /// Bring the audio clock up, recreating it if it was closed.
    ///
    /// Call this at the very start of a user-initiated interaction, before
    /// anything that blocks; some hosts refuse to start audio otherwise.
    pub fn ensure_audio(&self) -> Result<(), PlaybackError> {
        self.shared.ctx.ensure_running().map(|_| ())
    }

    /// Start playback of `timeline` from `from_tick`.
    ///
    /// `instrument` overrides the session's current instrument; `None`
    /// keeps it. May block while the clock comes up or the backend loads;
    /// a `play()`/`stop()` issued meanwhile supersedes this call, which
    /// then returns `Ok(())` without having scheduled anything. A backend
    /// load failure propagates and leaves the transport Stopped.
    pub fn play(
        &self,
        timeline: Arc<EventData>,
        from_tick: u64,
        instrument: Option<&str>,
    ) -> Result<(), PlaybackError> {
        let shared = &self.shared;

        let (generation, instrument) = {
            let _commands = shared.commands.lock().expect("command lock poisoned");
            let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

            // The generation bump has already told any previous tracker and
            // backstop to wind down; silence whatever is still sounding.
            shared.ctx.backends().stop_all();

            let mut session = shared.session.lock().expect("session lock poisoned");
            session.paused_tick = 0;
            if session.state == TransportState::Paused {
                session.state = TransportState::Stopped;
            }
            let instrument = instrument
                .map(str::to_string)
                .unwrap_or_else(|| session.instrument.clone());
            (generation, instrument)
        };

        log::debug!("[TRANSPORT] play gen={generation} from_tick={from_tick} inst={instrument}");

        // Blocking section: clock bring-up and backend load. The command
        // lock is not held here, so later commands can supersede us.
        shared.loading.store(true, Ordering::SeqCst);
        let clock = match shared.ctx.ensure_running() {
            Ok(clock) => clock,
            Err(e) => return self.fail_or_yield(generation, e),
        };
        if !self.is_current(generation) {
            shared.loading.store(false, Ordering::SeqCst);
            return Ok(());
        }

        let backend = match shared.ctx.backends().load(&instrument) {
            Ok(backend) => backend,
            Err(e) => return self.fail_or_yield(generation, e),
        };
        shared.loading.store(false, Ordering::SeqCst);

        let _commands = shared.commands.lock().expect("command lock poisoned");
        if !self.is_current(generation) {
            return Ok(());
        }

        let bpm = timeline.effective_bpm();
        let now = clock.now();
        let anchor = now - ticks_to_seconds(from_tick as f64, bpm);
        let total_ticks = timeline.total_ticks;
        let total_seconds = ticks_to_seconds(total_ticks as f64, bpm);

        {
            let mut session = shared.session.lock().expect("session lock poisoned");
            session.instrument = instrument;
            session.bpm = bpm;
            session.clock_anchor = anchor;
            session.duration_ticks = total_ticks;
            session.timeline = Some(timeline.clone());
        }

        scheduler::schedule_notes(&timeline, from_tick, now, backend.as_ref());

        {
            let mut session = shared.session.lock().expect("session lock poisoned");
            session.state = TransportState::Playing;
        }
        shared.current_tick.store(from_tick, Ordering::SeqCst);
        let _ = shared.event_tx.send(TransportEvent::Started { from_tick });

        let remaining = ticks_to_seconds(total_ticks.saturating_sub(from_tick) as f64, bpm);
        self.spawn_auto_stop(generation, remaining);
        self.spawn_tracker(generation, clock, anchor, bpm, total_ticks, total_seconds);

        Ok(())
    }

    /// Pause playback, remembering the current tick for [`Player::resume`].
    ///
    /// Silences everything currently sounding; pause does not let notes
    /// ring out. A silent no-op unless playing.
    pub fn pause(&self) {
        let _commands = self.shared.commands.lock().expect("command lock poisoned");
        let at_tick = {
            let mut session = self.shared.session.lock().expect("session lock poisoned");
            if session.state != TransportState::Playing {
                return;
            }
            let tick = self.shared.current_tick.load(Ordering::SeqCst);
            session.paused_tick = tick;
            session.state = TransportState::Paused;
            tick
        };
        // Tracker and backstop see the state change and wind down.
        self.shared.ctx.backends().stop_all();
        log::debug!("[TRANSPORT] paused at tick {at_tick}");
        let _ = self.shared.event_tx.send(TransportEvent::Paused { at_tick });
    }

    /// Resume a paused session from the tick recorded at pause time.
    ///
    /// A silent no-op unless paused with a cached timeline.
    pub fn resume(&self) -> Result<(), PlaybackError> {
        let (timeline, from_tick) = {
            let session = self.shared.session.lock().expect("session lock poisoned");
            if session.state != TransportState::Paused {
                return Ok(());
            }
            match &session.timeline {
                Some(timeline) => (timeline.clone(), session.paused_tick),
                None => return Ok(()),
            }
        };
        self.play(timeline, from_tick, None)
    }

    /// Stop playback and reset the position to zero.
    ///
    /// Valid from any state and idempotent. Allocates a new generation, so
    /// any in-flight `play()`, tracker or backstop becomes a no-op.
    pub fn stop(&self) {
        let _commands = self.shared.commands.lock().expect("command lock poisoned");
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.finish_stop(false);
    }

    /// Move the position without touching playback.
    ///
    /// Callers pair this with an explicit `play()`/`resume()` when they
    /// want the repositioning to be audible.
    pub fn seek(&self, tick: u64) {
        let mut session = self.shared.session.lock().expect("session lock poisoned");
        session.paused_tick = tick;
        self.shared.current_tick.store(tick, Ordering::SeqCst);
    }

    /// Dispatch to pause/resume/play based on the current state.
    ///
    /// Ignored entirely while a load is in progress.
    pub fn toggle_play(
        &self,
        timeline: Arc<EventData>,
        instrument: Option<&str>,
    ) -> Result<(), PlaybackError> {
        if self.is_loading() {
            return Ok(());
        }
        match self.state() {
            TransportState::Playing => {
                self.pause();
                Ok(())
            }
            TransportState::Paused => self.resume(),
            TransportState::Stopped => self.play(timeline, 0, instrument),
        }
    }

    /// Current transport state.
    pub fn state(&self) -> TransportState {
        self.shared.session.lock().expect("session lock poisoned").state
    }

    /// Whether the transport is playing.
    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    /// Whether the transport is paused.
    pub fn is_paused(&self) -> bool {
        self.state() == TransportState::Paused
    }

    /// Whether a clock bring-up or backend load is in progress.
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    /// Whether the session's current instrument is loaded and ready.
    pub fn is_ready(&self) -> bool {
        let instrument = {
            let session = self.shared.session.lock().expect("session lock poisoned");
            session.instrument.clone()
        };
        self.shared.ctx.backends().contains(&instrument)
    }

    /// Current playback position in ticks.
    pub fn current_tick(&self) -> u64 {
        self.shared.current_tick.load(Ordering::SeqCst)
    }

    /// Length of the cached timeline in ticks (0 before the first play).
    pub fn duration(&self) -> u64 {
        self.shared.session.lock().expect("session lock poisoned").duration_ticks
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == generation
    }

    /// Stop on behalf of generation `expected`; a no-op if superseded.
    fn stop_for_generation(&self, expected: u64, finished: bool) {
        let _commands = self.shared.commands.lock().expect("command lock poisoned");
        if self
            .shared
            .generation
            .compare_exchange(expected, expected + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.finish_stop(finished);
    }

    /// Shared tail of every stop path. Caller holds the command lock and
    /// has already advanced the generation.
    fn finish_stop(&self, finished: bool) {
        {
            let mut session = self.shared.session.lock().expect("session lock poisoned");
            session.state = TransportState::Stopped;
            session.paused_tick = 0;
        }
        self.shared.current_tick.store(0, Ordering::SeqCst);
        self.shared.ctx.backends().stop_all();
        let event = if finished {
            TransportEvent::Finished
        } else {
            TransportEvent::Stopped
        };
        log::debug!("[TRANSPORT] stopped (finished={finished})");
        let _ = self.shared.event_tx.send(event);
    }

    /// Handle a resource failure inside `play()`.
    ///
    /// If this call is still the current command, roll back to Stopped with
    /// no partial session state and propagate the error. If a later command
    /// has superseded it, the failure belongs to a command that no longer
    /// owns the transport: yield silently instead of clobbering the newer
    /// session.
    fn fail_or_yield(&self, generation: u64, error: PlaybackError) -> Result<(), PlaybackError> {
        self.shared.loading.store(false, Ordering::SeqCst);
        let _commands = self.shared.commands.lock().expect("command lock poisoned");
        if !self.is_current(generation) {
            return Ok(());
        }
        {
            let mut session = self.shared.session.lock().expect("session lock poisoned");
            session.state = TransportState::Stopped;
            session.paused_tick = 0;
        }
        self.shared.current_tick.store(0, Ordering::SeqCst);
        Err(error)
    }

    /// Wall-clock backstop: stop once the timeline must be over, even if
    /// the position tracker stalled.
    fn spawn_auto_stop(&self, generation: u64, remaining_seconds: f64) {
        let player = self.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(remaining_seconds + AUTO_STOP_MARGIN));
            if !player.is_current(generation) {
                return;
            }
            if player.state() != TransportState::Playing {
                return;
            }
            log::debug!("[TRANSPORT] auto-stop backstop fired (gen={generation})");
            player.stop_for_generation(generation, true);
        });
    }

    /// Position tracker: the sole mutator of `current_tick` during active
    /// playback. Terminates silently once its generation is stale or the
    /// transport leaves Playing.
    fn spawn_tracker(
        &self,
        generation: u64,
        clock: Arc<dyn AudioClock>,
        anchor: f64,
        bpm: f64,
        total_ticks: u64,
        total_seconds: f64,
    ) {
        let player = self.clone();
        thread::spawn(move || loop {
            if !player.is_current(generation) {
                return;
            }
            if player.state() != TransportState::Playing {
                return;
            }

            let elapsed = clock.now() - anchor;
            let tick = seconds_to_ticks(elapsed, bpm).max(0.0) as u64;
            player.shared.current_tick.store(tick, Ordering::SeqCst);

            if tick >= total_ticks || elapsed >= total_seconds + END_SLACK {
                player.stop_for_generation(generation, true);
                return;
            }

            thread::sleep(POLL_INTERVAL);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendFactory, SoundBackend};
    use crate::clock::{ClockFactory, ClockState};
    use crate::events::{NoteEvent, TrackData};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Clock whose time only moves when the test says so.
    struct ManualClock {
        time: Mutex<f64>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                time: Mutex::new(0.0),
            }
        }

        fn set(&self, seconds: f64) {
            *self.time.lock().unwrap() = seconds;
        }
    }

    impl AudioClock for ManualClock {
        fn now(&self) -> f64 {
            *self.time.lock().unwrap()
        }

        fn state(&self) -> ClockState {
            ClockState::Running
        }

        fn resume(&self) -> Result<(), PlaybackError> {
            Ok(())
        }
    }

    struct ManualClockFactory(Arc<ManualClock>);

    impl ClockFactory for ManualClockFactory {
        fn create(&self) -> Arc<dyn AudioClock> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        starts: Mutex<Vec<(u8, u8, f64, f64)>>,
        stops: AtomicUsize,
    }

    impl RecordingBackend {
        fn pitches(&self) -> Vec<u8> {
            self.starts.lock().unwrap().iter().map(|s| s.0).collect()
        }

        fn clear(&self) {
            self.starts.lock().unwrap().clear();
        }
    }

    impl SoundBackend for RecordingBackend {
        fn start(&self, pitch: u8, velocity: u8, when: f64, duration: f64) {
            self.starts
                .lock()
                .unwrap()
                .push((pitch, velocity, when, duration));
        }

        fn stop(&self) -> anyhow::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingFactory {
        backend: Arc<RecordingBackend>,
    }

    impl BackendFactory for RecordingFactory {
        fn load(&self, _instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
            Ok(self.backend.clone())
        }
    }

    /// Factory whose loads block until the test releases them.
    struct GatedFactory {
        backend: Arc<RecordingBackend>,
        load_started: Sender<()>,
        gate: Receiver<()>,
    }

    impl BackendFactory for GatedFactory {
        fn load(&self, _instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
            let _ = self.load_started.send(());
            let _ = self.gate.recv();
            Ok(self.backend.clone())
        }
    }

    struct FailingFactory;

    impl BackendFactory for FailingFactory {
        fn load(&self, instrument: &str) -> Result<Arc<dyn SoundBackend>, PlaybackError> {
            Err(PlaybackError::InstrumentLoad {
                name: instrument.to_string(),
                reason: "download failed".to_string(),
            })
        }
    }

    fn timeline(bpm: f64, total_ticks: u64, notes: Vec<NoteEvent>) -> Arc<EventData> {
        Arc::new(EventData {
            bpm,
            total_ticks,
            description: String::new(),
            tracks: vec![TrackData {
                name: "test".to_string(),
                channel: 0,
                program: 0,
                note_count: notes.len() as u32,
                notes,
            }],
        })
    }

    fn note(pitch: u8, start_tick: u64, duration: u64) -> NoteEvent {
        NoteEvent {
            pitch,
            velocity: 100,
            start_tick,
            duration,
            voice: 0,
        }
    }

    /// Player over a manual clock and a recording backend.
    fn manual_player() -> (Player, Arc<ManualClock>, Arc<RecordingBackend>) {
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(RecordingBackend::default());
        let ctx = Arc::new(PlaybackContext::new(
            Box::new(ManualClockFactory(clock.clone())),
            Arc::new(RecordingFactory {
                backend: backend.clone(),
            }),
        ));
        (Player::new(ctx), clock, backend)
    }

    fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[test]
    fn test_play_transitions_to_playing() {
        let (player, _clock, backend) = manual_player();
        let timeline = timeline(100.0, 9600, vec![note(60, 0, 480), note(64, 480, 480)]);

        player.play(timeline, 0, Some("organ")).unwrap();

        assert!(player.is_playing());
        assert!(player.is_ready());
        assert!(!player.is_loading());
        assert_eq!(player.current_tick(), 0);
        assert_eq!(player.duration(), 9600);
        assert_eq!(backend.pitches(), vec![60, 64]);
        assert_eq!(
            player.events().try_recv().unwrap(),
            TransportEvent::Started { from_tick: 0 }
        );
    }

    #[test]
    fn test_play_from_offset_skips_past_notes() {
        let (player, _clock, backend) = manual_player();
        let timeline = timeline(
            100.0,
            9600,
            vec![note(60, 0, 480), note(64, 2400, 480), note(67, 4800, 480)],
        );

        player.play(timeline, 2400, None).unwrap();

        assert_eq!(player.current_tick(), 2400);
        assert_eq!(backend.pitches(), vec![64, 67]);
    }

    #[test]
    fn test_pause_resume_resumes_at_recorded_tick() {
        let (player, clock, backend) = manual_player();
        let timeline = timeline(
            100.0,
            9600,
            vec![note(60, 0, 480), note(64, 2400, 480), note(67, 4800, 480)],
        );

        player.play(timeline, 0, None).unwrap();
        assert!(player.is_playing());

        // Advance the clock to exactly tick 2400 and let the tracker see it.
        clock.set(ticks_to_seconds(2400.0, 100.0));
        assert!(wait_until(
            || player.current_tick() == 2400,
            Duration::from_secs(2)
        ));

        player.pause();
        assert!(player.is_paused());
        assert_eq!(player.current_tick(), 2400);

        backend.clear();
        player.resume().unwrap();

        assert!(player.is_playing());
        assert_eq!(player.current_tick(), 2400);
        // The note at tick 0 is entirely in the past; the rest replay.
        assert_eq!(backend.pitches(), vec![64, 67]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (player, _clock, backend) = manual_player();
        let timeline = timeline(100.0, 9600, vec![note(60, 0, 480)]);

        player.play(timeline, 0, None).unwrap();
        player.stop();
        player.stop();

        assert_eq!(player.state(), TransportState::Stopped);
        assert_eq!(player.current_tick(), 0);
        // Every stop silences the loaded backends.
        assert!(backend.stops.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_pause_while_stopped_is_noop() {
        let (player, _clock, _backend) = manual_player();
        player.pause();
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_resume_without_session_is_noop() {
        let (player, _clock, backend) = manual_player();
        player.resume().unwrap();
        assert_eq!(player.state(), TransportState::Stopped);
        assert!(backend.pitches().is_empty());
    }

    #[test]
    fn test_seek_moves_position_without_transition() {
        let (player, _clock, _backend) = manual_player();
        player.seek(1234);
        assert_eq!(player.current_tick(), 1234);
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_load_failure_rolls_back_to_stopped() {
        let clock = Arc::new(ManualClock::new());
        let ctx = Arc::new(PlaybackContext::new(
            Box::new(ManualClockFactory(clock)),
            Arc::new(FailingFactory),
        ));
        let player = Player::new(ctx);
        let timeline = timeline(100.0, 9600, vec![note(60, 0, 480)]);

        let result = player.play(timeline, 0, Some("organ"));

        assert!(result.is_err());
        assert_eq!(player.state(), TransportState::Stopped);
        assert!(!player.is_loading());
        assert_eq!(player.current_tick(), 0);
    }

    #[test]
    fn test_rapid_plays_last_wins() {
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(RecordingBackend::default());
        let (started_tx, started_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded();
        let ctx = Arc::new(PlaybackContext::new(
            Box::new(ManualClockFactory(clock)),
            Arc::new(GatedFactory {
                backend: backend.clone(),
                load_started: started_tx,
                gate: gate_rx,
            }),
        ));
        let player = Player::new(ctx);

        let first = timeline(100.0, 9600, vec![note(10, 0, 480)]);
        let second = timeline(100.0, 9600, vec![note(20, 0, 480)]);

        let p1 = player.clone();
        let h1 = thread::spawn(move || p1.play(first, 0, Some("organ")));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("first load never started");

        let p2 = player.clone();
        let h2 = thread::spawn(move || p2.play(second, 0, Some("violin")));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("second load never started");

        // Release both loads in whatever order; only the later generation
        // may schedule.
        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        h1.join().unwrap().unwrap();
        h2.join().unwrap().unwrap();

        assert!(player.is_playing());
        assert_eq!(backend.pitches(), vec![20]);
    }

    #[test]
    fn test_toggle_play_ignored_while_loading() {
        let clock = Arc::new(ManualClock::new());
        let backend = Arc::new(RecordingBackend::default());
        let (started_tx, started_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded();
        let ctx = Arc::new(PlaybackContext::new(
            Box::new(ManualClockFactory(clock)),
            Arc::new(GatedFactory {
                backend: backend.clone(),
                load_started: started_tx,
                gate: gate_rx,
            }),
        ));
        let player = Player::new(ctx);
        let first = timeline(100.0, 9600, vec![note(10, 0, 480)]);
        let other = timeline(100.0, 9600, vec![note(20, 0, 480)]);

        let p1 = player.clone();
        let t1 = first.clone();
        let h1 = thread::spawn(move || p1.play(t1, 0, None));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("load never started");

        assert!(player.is_loading());
        player.toggle_play(other, None).unwrap();
        // No transition, no second load.
        assert_eq!(player.state(), TransportState::Stopped);

        gate_tx.send(()).unwrap();
        h1.join().unwrap().unwrap();
        assert!(player.is_playing());
        assert_eq!(backend.pitches(), vec![10]);
    }

    #[test]
    fn test_toggle_play_dispatches_by_state() {
        let (player, _clock, _backend) = manual_player();
        let timeline = timeline(100.0, 9600, vec![note(60, 0, 480)]);

        player.toggle_play(timeline.clone(), None).unwrap();
        assert!(player.is_playing());

        player.toggle_play(timeline.clone(), None).unwrap();
        assert!(player.is_paused());

        player.toggle_play(timeline, None).unwrap();
        assert!(player.is_playing());
    }

    #[test]
    fn test_tracker_auto_stops_at_timeline_end() {
        let (player, clock, _backend) = manual_player();
        // 480 ticks at 100 BPM = 0.6 seconds.
        let timeline = timeline(100.0, 480, vec![note(60, 0, 480)]);
        let events = player.events();

        player.play(timeline, 0, None).unwrap();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)).unwrap(),
            TransportEvent::Started { from_tick: 0 }
        );

        clock.set(1.0);

        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)).unwrap(),
            TransportEvent::Finished
        );
        assert_eq!(player.state(), TransportState::Stopped);
        assert_eq!(player.current_tick(), 0);
    }

    #[test]
    fn test_backstop_fires_when_tracker_stalls() {
        let (player, _clock, _backend) = manual_player();
        // The manual clock never advances, so the tracker alone would poll
        // forever; the wall-clock backstop must end the session. 48 ticks
        // at 600 BPM is 10ms of music plus the fixed margin.
        let timeline = timeline(600.0, 48, vec![note(60, 0, 48)]);
        let events = player.events();

        player.play(timeline, 0, None).unwrap();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)).unwrap(),
            TransportEvent::Started { from_tick: 0 }
        );

        assert_eq!(
            events.recv_timeout(Duration::from_secs(3)).unwrap(),
            TransportEvent::Finished
        );
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_stop_resets_paused_state() {
        let (player, _clock, _backend) = manual_player();
        let timeline = timeline(100.0, 9600, vec![note(60, 0, 480)]);

        player.play(timeline, 0, None).unwrap();
        player.pause();
        player.seek(500);
        player.stop();

        assert_eq!(player.state(), TransportState::Stopped);
        assert_eq!(player.current_tick(), 0);
        // A resume after stop must be a no-op even though a timeline is
        // still cached.
        player.resume().unwrap();
        assert_eq!(player.state(), TransportState::Stopped);
    }
}
