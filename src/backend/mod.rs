//! Audio backend abstraction.
//!
//! The stream core never talks to the audio library directly. It opens a
//! [`BackendStream`] through an [`AudioBackend`] and hands it a
//! [`StreamCallbacks`] bundle that the backend invokes from its realtime
//! thread.
//!
//! - [`CpalBackend`]: real hardware via CPAL
//! - [`MockBackend`]: deterministic backend driven by tests

mod cpal_host;
mod mock;

pub use cpal_host::CpalBackend;
pub use mock::{MockBackend, MockDevice, MockStreamHandle, StreamEnd};

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Direction, SampleFormat};
use crate::StreamAudioError;

/// Frames per buffer requested on ARM targets, where the default is too small.
pub const ARM_FRAMES_PER_BUFFER: u32 = 256;

/// Status conditions reported by the backend alongside a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct StatusFlags(u32);

impl StatusFlags {
    /// Input data was requested but not available.
    pub const INPUT_UNDERFLOW: Self = Self(0x01);
    /// Input data was discarded because the callback was late.
    pub const INPUT_OVERFLOW: Self = Self(0x02);
    /// Output had a gap because the callback was late.
    pub const OUTPUT_UNDERFLOW: Self = Self(0x04);
    /// Output data was discarded.
    pub const OUTPUT_OVERFLOW: Self = Self(0x08);
    /// The callback is priming the output buffers before start.
    pub const PRIMING_OUTPUT: Self = Self(0x10);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::INPUT_UNDERFLOW, "input underflow"),
        (Self::INPUT_OVERFLOW, "input overflow"),
        (Self::OUTPUT_UNDERFLOW, "output underflow"),
        (Self::OUTPUT_OVERFLOW, "output overflow"),
        (Self::PRIMING_OUTPUT, "priming output"),
    ];

    /// Returns flags with nothing set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns the human-readable names of the set flags.
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for StatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

/// What the backend should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    /// Keep delivering buffers.
    Continue,
    /// Every configured direction has finished; streaming may stop.
    Complete,
}

/// Realtime callback: `(input, output, frame_count, status)`.
///
/// `input` holds the captured bytes, `output` the buffer to fill. A backend
/// running input and output on separate threads passes only the half it
/// owns; the other is `None`.
pub type ProcessFn = Arc<
    dyn Fn(Option<&[u8]>, Option<&mut [u8]>, usize, StatusFlags) -> CallbackResult + Send + Sync,
>;

/// Receives asynchronous stream errors from the backend.
pub type ErrorFn = Arc<dyn Fn(String) + Send + Sync>;

/// Callbacks handed to [`AudioBackend::open_stream`].
#[derive(Clone)]
pub struct StreamCallbacks {
    /// Invoked once per hardware buffer.
    pub process: ProcessFn,
    /// Invoked when the backend reports a stream error.
    pub error: ErrorFn,
}

/// What a device can do in one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    /// Device name.
    pub name: String,
    /// Maximum channel count for the direction.
    pub max_channels: u16,
    /// Device's default sample rate.
    pub default_sample_rate: u32,
    /// Latency suggested for interactive use, if the host reports one.
    pub default_low_latency: Option<Duration>,
    /// Latency suggested for robust playback, if the host reports one.
    pub default_high_latency: Option<Duration>,
}

/// Parameters for one direction of a stream being opened.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionParams {
    /// Device to open; `None` for the default device.
    pub device_id: Option<usize>,
    /// Interleaved channel count.
    pub channel_count: u16,
    /// Sample representation.
    pub sample_format: SampleFormat,
    /// Suggested latency, if the device reports one.
    pub suggested_latency: Option<Duration>,
}

/// Parameters for a stream being opened.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    /// Capture parameters.
    pub input: Option<DirectionParams>,
    /// Playback parameters.
    pub output: Option<DirectionParams>,
    /// Sample rate shared by both directions.
    pub sample_rate: u32,
    /// Fixed buffer size in frames, or `None` to let the host choose.
    pub frames_per_buffer: Option<u32>,
}

/// One entry in a device listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Id accepted by [`AudioOptions::device_id`](crate::AudioOptions::device_id).
    pub id: usize,
    /// Device name.
    pub name: String,
    /// Maximum capture channels (0 if the device cannot capture).
    pub max_input_channels: u16,
    /// Maximum playback channels (0 if the device cannot play).
    pub max_output_channels: u16,
    /// Default sample rate.
    pub default_sample_rate: u32,
    /// Name of the host API the device belongs to.
    pub host_api: String,
}

/// One entry in a host API listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostApiInfo {
    /// Index of the host API.
    pub id: usize,
    /// Host API name.
    pub name: String,
    /// Number of devices the host API exposes.
    pub device_count: usize,
    /// Whether this is the default host API.
    pub is_default: bool,
}

/// An audio library capable of opening streams.
pub trait AudioBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Looks up a device's capabilities for a direction.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound` if `device_id` does not exist
    /// - `NoDefaultDevice` if `device_id` is `None` and no default exists
    fn device_capabilities(
        &self,
        direction: Direction,
        device_id: Option<usize>,
    ) -> Result<DeviceCapabilities, StreamAudioError>;

    /// Opens (but does not start) a stream.
    fn open_stream(
        &self,
        params: &StreamParams,
        callbacks: StreamCallbacks,
    ) -> Result<Box<dyn BackendStream>, StreamAudioError>;

    /// Lists every device.
    fn devices(&self) -> Result<Vec<DeviceInfo>, StreamAudioError>;

    /// Lists the available host APIs.
    fn host_apis(&self) -> Result<Vec<HostApiInfo>, StreamAudioError>;
}

/// An open hardware stream.
pub trait BackendStream: Send {
    /// Begins delivering callbacks.
    fn start(&mut self) -> Result<(), StreamAudioError>;

    /// Stops after buffers already handed to the hardware have played.
    fn stop(&mut self) -> Result<(), StreamAudioError>;

    /// Stops immediately, discarding buffers in flight.
    fn abort(&mut self) -> Result<(), StreamAudioError>;

    /// Releases the device. No callback runs after this returns.
    fn close(self: Box<Self>);
}
