//! Configuration types for audio streams.

use std::fmt;
use std::str::FromStr;

use crate::StreamAudioError;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of interleaved channels.
pub const DEFAULT_CHANNEL_COUNT: u16 = 2;

/// Default bounded queue depth, in chunks.
pub const DEFAULT_MAX_QUEUE: usize = 2;

/// Stream direction, as seen from the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Capture: hardware produces, application reads.
    Input,
    /// Playback: application writes, hardware consumes.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Integer PCM sample representation.
///
/// Samples are interleaved and little-endian as delivered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Signed 8-bit.
    #[default]
    Int8,
    /// Signed 16-bit.
    Int16,
    /// Signed 24-bit, packed in 3 bytes.
    Int24,
    /// Signed 32-bit.
    Int32,
}

impl SampleFormat {
    /// Returns the bit depth.
    #[must_use]
    pub fn bits(&self) -> u32 {
        match self {
            Self::Int8 => 8,
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Int32 => 32,
        }
    }

    /// Returns the number of bytes per sample.
    #[must_use]
    pub fn bytes_per_sample(&self) -> usize {
        self.bits() as usize / 8
    }
}

impl TryFrom<u32> for SampleFormat {
    type Error = StreamAudioError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(Self::Int8),
            16 => Ok(Self::Int16),
            24 => Ok(Self::Int24),
            32 => Ok(Self::Int32),
            bits => Err(StreamAudioError::UnsupportedSampleFormat { bits }),
        }
    }
}

/// Options for one direction of a stream.
///
/// # Example
///
/// ```
/// use stream_audio_io::{AudioOptions, SampleFormat};
///
/// let options = AudioOptions {
///     sample_rate: 48000,
///     sample_format: SampleFormat::Int16,
///     max_queue: 4,
///     ..Default::default()
/// };
/// assert_eq!(options.bytes_per_frame(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOptions {
    /// Device to open. `None` selects the host's default device.
    pub device_id: Option<usize>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channel_count: u16,
    /// Sample representation.
    pub sample_format: SampleFormat,
    /// Maximum number of chunks buffered between application and hardware.
    ///
    /// Writers block (and the input callback blocks) once this many chunks
    /// are queued.
    pub max_queue: usize,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: DEFAULT_CHANNEL_COUNT,
            sample_format: SampleFormat::default(),
            max_queue: DEFAULT_MAX_QUEUE,
        }
    }
}

impl AudioOptions {
    /// Selects a specific device.
    #[must_use]
    pub fn with_device(mut self, device_id: usize) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Returns the size of one frame (one sample per channel) in bytes.
    #[must_use]
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * self.sample_format.bytes_per_sample()
    }

    /// Returns the number of bytes occupied by `frames` frames.
    #[must_use]
    pub fn bytes_for_frames(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }

    fn validate(&self) -> Result<(), StreamAudioError> {
        if self.max_queue == 0 {
            return Err(StreamAudioError::InvalidQueueDepth);
        }
        Ok(())
    }
}

impl fmt::Display for AudioOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.device_id {
            Some(id) => id.to_string(),
            None => "default".to_string(),
        };
        write!(
            f,
            "device {device}, {}Hz, {}ch, {}-bit, max queue {}",
            self.sample_rate,
            self.channel_count,
            self.sample_format.bits(),
            self.max_queue
        )
    }
}

/// Options for a whole stream: input, output, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Capture options, if the stream reads from hardware.
    pub input: Option<AudioOptions>,
    /// Playback options, if the stream writes to hardware.
    pub output: Option<AudioOptions>,
}

impl StreamOptions {
    /// Creates capture-only options.
    pub fn input_only(options: AudioOptions) -> Self {
        Self {
            input: Some(options),
            output: None,
        }
    }

    /// Creates playback-only options.
    pub fn output_only(options: AudioOptions) -> Self {
        Self {
            input: None,
            output: Some(options),
        }
    }

    /// Creates full-duplex options.
    pub fn duplex(input: AudioOptions, output: AudioOptions) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
        }
    }

    /// Returns the stream sample rate shared by all configured directions.
    pub fn sample_rate(&self) -> Option<u32> {
        self.input
            .as_ref()
            .or(self.output.as_ref())
            .map(|o| o.sample_rate)
    }

    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// - `NoDirectionConfigured` if both directions are absent
    /// - `SampleRateMismatch` if a duplex stream has differing rates
    /// - `InvalidQueueDepth` if either direction has a zero queue depth
    pub fn validate(&self) -> Result<(), StreamAudioError> {
        match (&self.input, &self.output) {
            (None, None) => return Err(StreamAudioError::NoDirectionConfigured),
            (Some(input), Some(output)) if input.sample_rate != output.sample_rate => {
                return Err(StreamAudioError::SampleRateMismatch {
                    input: input.sample_rate,
                    output: output.sample_rate,
                });
            }
            _ => {}
        }
        for options in self.input.iter().chain(self.output.iter()) {
            options.validate()?;
        }
        Ok(())
    }
}

/// How [`StreamContext::quit`](crate::StreamContext::quit) stops the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Play out everything already written, then stop.
    #[default]
    Wait,
    /// Stop immediately, discarding in-flight hardware buffers and queued output.
    Abort,
}

impl FromStr for StopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAIT" => Ok(Self::Wait),
            "ABORT" => Ok(Self::Abort),
            other => Err(format!("expected 'WAIT' or 'ABORT', got '{other}'")),
        }
    }
}

impl fmt::Display for StopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait => f.write_str("WAIT"),
            Self::Abort => f.write_str("ABORT"),
        }
    }
}
