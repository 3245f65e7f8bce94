//! Error types for stream-audio-io.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`StreamAudioError`]): configuration, startup, and API
//!   misuse. These are returned synchronously to the caller.
//! - **Runtime status conditions**: underflow/overflow reported by the audio
//!   backend. These never fail an operation; they are recorded on the stream
//!   and handed back through [`Completion::status`](crate::Completion::status).

use crate::config::Direction;
use crate::context::StreamState;

/// Fatal errors returned by stream operations.
///
/// Configuration errors are raised while opening a stream and are never
/// retried. Runtime issues (underflow, overflow) are not represented here;
/// see [`StreamContext::take_error`](crate::StreamContext::take_error).
#[derive(Debug, thiserror::Error)]
pub enum StreamAudioError {
    /// Neither input nor output options were supplied.
    #[error("input and/or output options must be specified")]
    NoDirectionConfigured,

    /// A duplex stream was requested with different input and output rates.
    #[error("input and output sample rates must match (input {input}Hz, output {output}Hz)")]
    SampleRateMismatch {
        /// Requested input sample rate.
        input: u32,
        /// Requested output sample rate.
        output: u32,
    },

    /// The requested device id does not exist.
    #[error("device not found: {id}")]
    DeviceNotFound {
        /// Id of the device that wasn't found.
        id: usize,
    },

    /// No default device exists for the requested direction.
    #[error("no default {direction} device")]
    NoDefaultDevice {
        /// Direction that has no default device.
        direction: Direction,
    },

    /// The requested channel count exceeds what the device supports.
    #[error("channel count {requested} exceeds maximum of {max} {direction} channels for device '{device}'")]
    ChannelCountExceeded {
        /// Requested number of channels.
        requested: u16,
        /// Maximum reported by the device.
        max: u16,
        /// Direction the channels were requested for.
        direction: Direction,
        /// Device name.
        device: String,
    },

    /// The requested bit depth is not one of 8, 16, 24 or 32.
    #[error("unsupported sample format: {bits} bits")]
    UnsupportedSampleFormat {
        /// The rejected bit depth.
        bits: u32,
    },

    /// A queue depth of zero would block every producer forever.
    #[error("max queue depth must be at least 1")]
    InvalidQueueDepth,

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// The hardware refused to start streaming.
    #[error("could not start stream: {reason}")]
    StartFailed {
        /// Reason reported by the backend.
        reason: String,
    },

    /// The operation is not valid in the stream's current lifecycle state.
    #[error("cannot {operation} a stream that is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// State the stream was in.
        state: StreamState,
    },

    /// A read was issued on an output-only stream.
    #[error("cannot read from an output-only stream")]
    InputNotConfigured,

    /// A write was issued on an input-only stream.
    #[error("cannot write to an input-only stream")]
    OutputNotConfigured,

    /// The blocking worker running the operation panicked or was cancelled.
    #[error("worker failed: {reason}")]
    WorkerFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl StreamAudioError {
    /// Creates a backend error from anything displayable.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::BackendError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_mismatch_display() {
        let err = StreamAudioError::SampleRateMismatch {
            input: 44100,
            output: 48000,
        };
        assert_eq!(
            err.to_string(),
            "input and output sample rates must match (input 44100Hz, output 48000Hz)"
        );
    }

    #[test]
    fn test_channel_count_exceeded_display() {
        let err = StreamAudioError::ChannelCountExceeded {
            requested: 8,
            max: 2,
            direction: Direction::Output,
            device: "Speakers".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "channel count 8 exceeds maximum of 2 output channels for device 'Speakers'"
        );
    }

    #[test]
    fn test_invalid_state_display() {
        let err = StreamAudioError::InvalidState {
            operation: "start",
            state: StreamState::Stopped,
        };
        assert_eq!(err.to_string(), "cannot start a stream that is stopped");
    }

    #[test]
    fn test_backend_helper() {
        let err = StreamAudioError::backend("host went away");
        assert_eq!(err.to_string(), "audio backend error: host went away");
    }
}
