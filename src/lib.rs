//! # stream-audio-io
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Byte-oriented audio streaming over a realtime hardware callback.
//!
//! `stream-audio-io` lets general-purpose code read and write audio as
//! arbitrarily sized byte buffers while the hardware consumes and produces
//! fixed-size frame buffers on its own thread. Bounded queues apply
//! backpressure in both directions, and shutdown drains them so nothing
//! written is lost and nothing blocked is left hanging.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_audio_io::{AudioIo, AudioOptions, SampleFormat, StopMode, StreamOptions};
//!
//! let io = AudioIo::open(StreamOptions::duplex(
//!     AudioOptions { sample_format: SampleFormat::Int16, ..Default::default() },
//!     AudioOptions { sample_format: SampleFormat::Int16, ..Default::default() },
//! ))?;
//! io.start()?;
//!
//! // Echo captured audio back out
//! while let Some(chunk) = io.read(4096).await?.value {
//!     io.write(chunk).await?;
//! }
//!
//! io.quit(StopMode::Wait).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! write() → BoundedChunkQueue → ChunkAssembler → audio callback → hardware
//! hardware → audio callback → BoundedChunkQueue → ChunkAssembler → read()
//! ```
//!
//! - **Audio thread**: copies exactly one hardware buffer per callback,
//!   padding output with silence once the stream has drained
//! - **Chunk queues**: bounded FIFOs; a full queue blocks the producer, an
//!   empty one blocks the consumer, and `quit` releases both
//! - **Tokio runtime**: [`AudioIo`] runs the blocking side on the blocking
//!   pool and resolves with the data plus any pending stream status

#![warn(missing_docs)]
// Frame and byte arithmetic casts between integer widths
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod audio_io;
pub mod backend;
mod chunk;
mod config;
mod context;
mod devices;
mod error;
pub mod pipeline;

pub use audio_io::{AudioIo, Completion};
pub use backend::{AudioBackend, CpalBackend, DeviceInfo, HostApiInfo, StatusFlags};
pub use chunk::{Chunk, Memory};
pub use config::{
    AudioOptions, Direction, SampleFormat, StopMode, StreamOptions, DEFAULT_CHANNEL_COUNT,
    DEFAULT_MAX_QUEUE, DEFAULT_SAMPLE_RATE,
};
pub use context::{StreamContext, StreamState};
pub use devices::{list_devices, list_devices_with, list_host_apis, list_host_apis_with};
pub use error::StreamAudioError;
