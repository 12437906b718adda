//! Sound output capability.
//!
//! The playback thread owns exactly one `AudioDevice`, opened on first use.
//! Each tone gets its own transient output node (`ActiveTone`), so nothing
//! synthesis-related is shared between sessions.

use crate::error::PlaybackError;
use crate::session::SessionId;
use crate::tone::{ToneShape, ToneSource};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;

/// Everything a device needs to start one tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    pub session: SessionId,
    pub shape: ToneShape,
    pub duration: Duration,
}

/// A tone that has been started on a device.
///
/// Dropping the handle without calling `stop` lets the tone finish its decay.
pub trait ActiveTone {
    fn stop(&mut self);
}

/// Output device used by the playback runtime. Lives on the playback thread
/// only, so it need not be `Send`.
pub trait AudioDevice {
    /// Make sure output is running. Called before the first tone of every
    /// session.
    fn resume(&mut self) -> Result<(), PlaybackError>;

    /// Release output while idle. The next `resume` reacquires it.
    fn suspend(&mut self);

    fn start_tone(&mut self, request: &ToneRequest) -> Result<Box<dyn ActiveTone>, PlaybackError>;
}

// ── rodio ────────────────────────────────────────────────────────────────────

/// Default output device via rodio.
pub struct RodioDevice {
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl RodioDevice {
    /// Open the system default output.
    pub fn open() -> Result<Self, PlaybackError> {
        let output = open_default_output()?;
        log::info!("Opened default audio output");
        Ok(RodioDevice {
            output: Some(output),
        })
    }

    pub fn is_suspended(&self) -> bool {
        self.output.is_none()
    }
}

fn open_default_output() -> Result<(OutputStream, OutputStreamHandle), PlaybackError> {
    OutputStream::try_default().map_err(|e| {
        PlaybackError::AudioUnavailable(format!("Failed to open audio output: {}", e))
    })
}

impl AudioDevice for RodioDevice {
    fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.output.is_none() {
            self.output = Some(open_default_output()?);
            log::info!("Audio output resumed");
        }
        Ok(())
    }

    fn suspend(&mut self) {
        if self.output.take().is_some() {
            log::info!("Audio output suspended");
        }
    }

    fn start_tone(&mut self, request: &ToneRequest) -> Result<Box<dyn ActiveTone>, PlaybackError> {
        let (_, handle) = self
            .output
            .as_ref()
            .ok_or_else(|| PlaybackError::AudioUnavailable("Audio output is suspended".into()))?;
        let sink = Sink::try_new(handle).map_err(|e| {
            PlaybackError::AudioUnavailable(format!("Failed to create sink: {}", e))
        })?;
        sink.append(ToneSource::new(request.shape, request.duration));
        sink.play();
        Ok(Box::new(RodioTone { sink: Some(sink) }))
    }
}

struct RodioTone {
    sink: Option<Sink>,
}

impl ActiveTone for RodioTone {
    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl Drop for RodioTone {
    fn drop(&mut self) {
        // A dropped Sink cuts its audio; detach so the decay plays out.
        if let Some(sink) = self.sink.take() {
            sink.detach();
        }
    }
}

// ── Null ─────────────────────────────────────────────────────────────────────

/// Device that produces no sound. Timing is unaffected.
#[derive(Debug, Default)]
pub struct NullDevice;

struct NullTone;

impl ActiveTone for NullTone {
    fn stop(&mut self) {}
}

impl AudioDevice for NullDevice {
    fn resume(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn suspend(&mut self) {}

    fn start_tone(&mut self, _request: &ToneRequest) -> Result<Box<dyn ActiveTone>, PlaybackError> {
        Ok(Box::new(NullTone))
    }
}
