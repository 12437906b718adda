use thiserror::Error;

/// Errors reported by the playback runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The output device could not be opened or resumed.
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),

    /// The playback thread has exited.
    #[error("Playback runtime is not running")]
    RuntimeClosed,
}
