//! Chunk pipeline between the application and the audio callback.
//!
//! ```text
//! write() → ChunkAssembler (output) → audio callback → hardware
//! hardware → audio callback → ChunkAssembler (input) → read()
//! ```
//!
//! - **BoundedChunkQueue**: blocking FIFO that applies backpressure and
//!   drains on quit
//! - **ChunkAssembler**: cuts the chunk stream at arbitrary byte boundaries

mod assembler;
mod queue;

pub use assembler::{AssemblerGuard, ChunkAssembler};
pub use queue::BoundedChunkQueue;
