//! Playback runtime: dedicated playback thread with channel-based command
//! dispatch.
//!
//! The thread owns the `AudioDevice` (opened lazily on the first `Play`) and
//! the current session. It is driven by one timer: `recv_timeout` on the
//! command channel, with the deadline of the current step as timeout. Every
//! wake re-checks the session gate before starting the next step, so a stop
//! or a newer `play` takes effect at the next step boundary at the latest.
//!
//! `PlaybackController` is the caller-facing handle. It updates the shared
//! `SessionGate` synchronously, so a replaced session is dead before `play`
//! or `stop` returns, even if the thread has not seen the command yet.

use crate::device::{ActiveTone, AudioDevice, NullDevice, RodioDevice, ToneRequest};
use crate::error::PlaybackError;
use crate::message::{MorseMessage, Step, Timing};
use crate::session::{PlaybackState, PlaybackStatus, SessionGate, SessionId};
use crate::tone::ToneShape;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long the thread sleeps between wakes when nothing is playing.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Called once when a session reaches the end of its message.
pub type CompletionFn = Box<dyn FnOnce() + Send + 'static>;

/// Opens the output device on the playback thread.
pub type DeviceFactory =
    Box<dyn FnMut() -> Result<Box<dyn AudioDevice>, PlaybackError> + Send + 'static>;

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeConfig {
    pub timing: Timing,
    pub shape: ToneShape,
    /// Suspend the device after this long without a session.
    pub idle_suspend: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            timing: Timing::default(),
            shape: ToneShape::default(),
            idle_suspend: None,
        }
    }
}

// ── Commands & Events ────────────────────────────────────────────────────────

/// Commands sent to the playback thread.
enum PlaybackCmd {
    Play {
        session: SessionId,
        message: MorseMessage,
        on_complete: CompletionFn,
        reply: mpsc::Sender<Result<(), PlaybackError>>,
    },
    /// Wake the thread so it notices an invalidated session promptly.
    Stop,
    Shutdown,
}

/// Events emitted by the playback thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started(SessionId),
    Completed(SessionId),
    Stopped(SessionId),
    PlayError(String),
    Suspended,
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Thread-safe handle to the playback runtime.
///
/// This is the only way to change playback state. Cloning is cheap; all
/// clones drive the same thread.
#[derive(Clone)]
pub struct PlaybackController {
    tx: mpsc::Sender<PlaybackCmd>,
    gate: Arc<SessionGate>,
}

impl PlaybackController {
    /// Play `message`, replacing whatever is playing.
    ///
    /// `on_complete` runs on the playback thread when the message ends
    /// naturally; it is dropped unrun if the session is stopped or replaced.
    /// It must not call `play` itself, since `play` waits for the playback
    /// thread. An empty message completes immediately.
    pub fn play<F>(&self, message: MorseMessage, on_complete: F) -> Result<SessionId, PlaybackError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (session, replaced) = self.gate.begin();
        if let Some(old) = replaced {
            log::debug!("Session {} replaced by {}", old, session);
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        let cmd = PlaybackCmd::Play {
            session,
            message,
            on_complete: Box::new(on_complete),
            reply: reply_tx,
        };
        if self.tx.send(cmd).is_err() {
            self.gate.abandon(session);
            return Err(PlaybackError::RuntimeClosed);
        }
        match reply_rx.recv() {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.gate.abandon(session);
                Err(PlaybackError::RuntimeClosed)
            }
        }
    }

    /// Stop the current session. No-op when idle.
    pub fn stop(&self) {
        if let Some(session) = self.gate.invalidate() {
            log::debug!("Stop requested for session {}", session);
            let _ = self.tx.send(PlaybackCmd::Stop);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.gate.state() == PlaybackState::Playing
    }

    pub fn state(&self) -> PlaybackState {
        self.gate.state()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.gate.status()
    }

    /// Stop playback and end the playback thread.
    pub fn shutdown(&self) {
        self.gate.invalidate();
        let _ = self.tx.send(PlaybackCmd::Shutdown);
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────────

/// Spawn the playback runtime on the default rodio output.
pub fn spawn_playback_runtime<F>(config: RuntimeConfig, on_event: F) -> PlaybackController
where
    F: Fn(PlaybackEvent) + Send + 'static,
{
    spawn_with_device(
        config,
        Box::new(|| RodioDevice::open().map(|d| Box::new(d) as Box<dyn AudioDevice>)),
        on_event,
    )
}

/// Spawn a runtime that keeps time but makes no sound.
pub fn spawn_silent_runtime<F>(config: RuntimeConfig, on_event: F) -> PlaybackController
where
    F: Fn(PlaybackEvent) + Send + 'static,
{
    spawn_with_device(
        config,
        Box::new(|| Ok(Box::new(NullDevice) as Box<dyn AudioDevice>)),
        on_event,
    )
}

/// Spawn the playback runtime with a custom device factory.
///
/// `open_device` is called on the playback thread the first time a
/// non-empty message is played, and again on later plays until it succeeds.
/// `on_event` is called from the playback thread on every state change.
pub fn spawn_with_device<F>(
    config: RuntimeConfig,
    open_device: DeviceFactory,
    on_event: F,
) -> PlaybackController
where
    F: Fn(PlaybackEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<PlaybackCmd>();
    let gate = Arc::new(SessionGate::new());
    let thread_gate = gate.clone();

    // The device and tone handles are not Send; build the runtime on its
    // own thread.
    std::thread::Builder::new()
        .name("morse-playback".into())
        .spawn(move || {
            let runtime = Runtime {
                config,
                gate: thread_gate,
                open_device,
                device: None,
                session: None,
                idle_since: Instant::now(),
                suspended: false,
                on_event,
            };
            runtime.run(rx);
        })
        .expect("failed to spawn morse-playback thread");

    PlaybackController { tx, gate }
}

struct Session {
    id: SessionId,
    steps: Vec<Step>,
    cursor: usize,
    /// When the current step ends.
    deadline: Instant,
    tone: Option<Box<dyn ActiveTone>>,
    on_complete: Option<CompletionFn>,
}

struct Runtime<F> {
    config: RuntimeConfig,
    gate: Arc<SessionGate>,
    open_device: DeviceFactory,
    device: Option<Box<dyn AudioDevice>>,
    session: Option<Session>,
    idle_since: Instant,
    suspended: bool,
    on_event: F,
}

impl<F> Runtime<F>
where
    F: Fn(PlaybackEvent),
{
    fn run(mut self, rx: mpsc::Receiver<PlaybackCmd>) {
        loop {
            self.advance();
            self.maybe_suspend();

            let timeout = match &self.session {
                Some(s) => s.deadline.saturating_duration_since(Instant::now()),
                None => IDLE_POLL,
            };

            match rx.recv_timeout(timeout) {
                Ok(PlaybackCmd::Play {
                    session,
                    message,
                    on_complete,
                    reply,
                }) => {
                    let result = self.start(session, message, on_complete);
                    let _ = reply.send(result);
                }
                // The gate is already updated; the next advance() winds down.
                Ok(PlaybackCmd::Stop) => {}
                Ok(PlaybackCmd::Shutdown) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                // All handles dropped
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        if let Some(session) = self.session.take() {
            self.gate.abandon(session.id);
            self.gate.settle(session.id);
        }
        log::debug!("Playback thread exiting");
    }

    fn start(
        &mut self,
        id: SessionId,
        message: MorseMessage,
        on_complete: CompletionFn,
    ) -> Result<(), PlaybackError> {
        if !self.gate.is_active(id) {
            // Stopped or replaced before we got here. A newer session may
            // already be running; leave it alone.
            log::debug!("Session {} superseded before start", id);
            self.gate.settle(id);
            return Ok(());
        }

        // `id` is active, so whatever is still running has been invalidated.
        self.wind_down();

        (self.on_event)(PlaybackEvent::Started(id));

        if message.is_empty() {
            self.finish(id, Some(on_complete));
            return Ok(());
        }

        if let Err(e) = self.prepare_device() {
            log::error!("Cannot start session {}: {}", id, e);
            self.gate.abandon(id);
            (self.on_event)(PlaybackEvent::PlayError(e.to_string()));
            return Err(e);
        }

        log::debug!("Session {} playing {} symbols", id, message.len());
        self.session = Some(Session {
            id,
            steps: message.steps(self.config.timing),
            cursor: 0,
            deadline: Instant::now(),
            tone: None,
            on_complete: Some(on_complete),
        });
        Ok(())
    }

    /// Open the device on first use and make sure it is running.
    fn prepare_device(&mut self) -> Result<(), PlaybackError> {
        if self.device.is_none() {
            self.device = Some((self.open_device)()?);
        }
        if let Some(device) = self.device.as_mut() {
            device.resume()?;
        }
        self.suspended = false;
        Ok(())
    }

    /// Run every step whose start time has arrived.
    fn advance(&mut self) {
        loop {
            let Some(session) = self.session.as_mut() else {
                return;
            };

            if !self.gate.is_active(session.id) {
                self.wind_down();
                return;
            }

            let now = Instant::now();
            if now < session.deadline {
                return;
            }

            if let Some(mut tone) = session.tone.take() {
                tone.stop();
            }

            let Some(step) = session.steps.get(session.cursor).copied() else {
                let id = session.id;
                let on_complete = session.on_complete.take();
                self.session = None;
                self.finish(id, on_complete);
                return;
            };
            session.cursor += 1;
            // Accumulate from the previous deadline so steps don't drift.
            session.deadline += step.duration();

            if let Step::Tone(duration) = step {
                let request = ToneRequest {
                    session: session.id,
                    shape: self.config.shape,
                    duration,
                };
                let Some(device) = self.device.as_mut() else {
                    continue;
                };
                match self.gate.run_if_active(session.id, || device.start_tone(&request)) {
                    Some(Ok(tone)) => session.tone = Some(tone),
                    Some(Err(e)) => {
                        log::warn!("Tone failed in session {}: {}", session.id, e);
                        (self.on_event)(PlaybackEvent::PlayError(e.to_string()));
                    }
                    // Invalidated between checks; the next pass winds down.
                    None => {}
                }
            }
        }
    }

    /// Natural end of a session.
    fn finish(&mut self, id: SessionId, on_complete: Option<CompletionFn>) {
        self.idle_since = Instant::now();
        if self.gate.complete(id) {
            log::debug!("Session {} completed", id);
            (self.on_event)(PlaybackEvent::Completed(id));
            if let Some(cb) = on_complete {
                cb();
            }
        } else {
            // stop() won the race for the last step
            self.gate.settle(id);
            (self.on_event)(PlaybackEvent::Stopped(id));
        }
    }

    /// Drop the current session after it was invalidated. The sounding tone,
    /// if any, is left to finish its decay.
    fn wind_down(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!(
                "Session {} stopped at step {}/{}",
                session.id,
                session.cursor,
                session.steps.len()
            );
            self.idle_since = Instant::now();
            self.gate.settle(session.id);
            (self.on_event)(PlaybackEvent::Stopped(session.id));
        }
    }

    fn maybe_suspend(&mut self) {
        let Some(after) = self.config.idle_suspend else {
            return;
        };
        if self.suspended || self.session.is_some() || self.idle_since.elapsed() < after {
            return;
        }
        if let Some(device) = self.device.as_mut() {
            device.suspend();
            self.suspended = true;
            (self.on_event)(PlaybackEvent::Suspended);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
