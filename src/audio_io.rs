//! Async read/write surface over a [`StreamContext`].
//!
//! Every blocking operation on the context runs on tokio's blocking pool,
//! so awaiting a read or write never stalls the async runtime.

use std::sync::Arc;

use crate::backend::{AudioBackend, CpalBackend};
use crate::config::{StopMode, StreamOptions};
use crate::context::{StreamContext, StreamState};
use crate::{Chunk, StreamAudioError};

/// The result of an async operation plus any stream status reported meanwhile.
///
/// Status conditions (underflow, overflow, backend errors) never fail an
/// operation. The pending message is taken from the stream when the
/// operation completes and handed back here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Completion<T> {
    /// The operation's result.
    pub value: T,
    /// Status message recorded since the last completion, if any.
    pub status: Option<String>,
}

impl<T> Completion<T> {
    /// Returns the value, discarding the status.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// An open audio stream with an async API.
///
/// # Example
///
/// ```no_run
/// use stream_audio_io::{AudioIo, AudioOptions, SampleFormat, StopMode, StreamOptions};
///
/// # async fn example() -> Result<(), stream_audio_io::StreamAudioError> {
/// let io = AudioIo::open(StreamOptions::output_only(AudioOptions {
///     sample_rate: 48000,
///     sample_format: SampleFormat::Int16,
///     ..Default::default()
/// }))?;
/// io.start()?;
///
/// let done = io.write(vec![0u8; 4096]).await?;
/// if let Some(status) = done.status {
///     eprintln!("{status}");
/// }
///
/// io.quit(StopMode::Wait).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Dropping
///
/// Dropping a stream that was never quit aborts it on the dropping thread.
/// With [`CpalBackend`] that joins the thread owning the hardware stream,
/// which briefly blocks. Inside a tokio runtime prefer
/// `io.quit(StopMode::Abort).await` before the drop, which runs that work on
/// the blocking pool and leaves `Drop` with nothing to do.
pub struct AudioIo {
    context: Arc<StreamContext>,
}

impl AudioIo {
    /// Opens a stream on the default CPAL host.
    ///
    /// # Errors
    ///
    /// Any configuration error from [`StreamContext::open`].
    pub fn open(options: StreamOptions) -> Result<Self, StreamAudioError> {
        Self::open_with(&CpalBackend::new(), options)
    }

    /// Opens a stream through a specific backend.
    ///
    /// # Errors
    ///
    /// Any configuration error from [`StreamContext::open`].
    pub fn open_with(
        backend: &dyn AudioBackend,
        options: StreamOptions,
    ) -> Result<Self, StreamAudioError> {
        Ok(Self {
            context: StreamContext::open(backend, options)?,
        })
    }

    /// Starts hardware streaming.
    pub fn start(&self) -> Result<(), StreamAudioError> {
        self.context.start()
    }

    /// Reads up to `size` captured bytes.
    ///
    /// Resolves with fewer bytes near the end of the stream and with `None`
    /// once the input has drained after [`quit`](Self::quit).
    ///
    /// # Errors
    ///
    /// - `InputNotConfigured` on an output-only stream
    /// - `WorkerFailed` if the blocking worker panicked
    pub async fn read(&self, size: usize) -> Result<Completion<Option<Chunk>>, StreamAudioError> {
        if !self.context.has_input() {
            return Err(StreamAudioError::InputNotConfigured);
        }
        let context = Arc::clone(&self.context);
        let chunk = run_blocking(move || context.pull_in_chunk(size)).await?;
        Ok(self.complete(chunk))
    }

    /// Queues bytes for playback.
    ///
    /// Resolves once the bytes are accepted into the output queue, which
    /// waits while the queue is full.
    ///
    /// # Errors
    ///
    /// - `OutputNotConfigured` on an input-only stream
    /// - `WorkerFailed` if the blocking worker panicked
    pub async fn write(
        &self,
        bytes: impl Into<Chunk>,
    ) -> Result<Completion<()>, StreamAudioError> {
        if !self.context.has_output() {
            return Err(StreamAudioError::OutputNotConfigured);
        }
        let chunk = bytes.into();
        let context = Arc::clone(&self.context);
        run_blocking(move || context.push_out_chunk(chunk)).await?;
        Ok(self.complete(()))
    }

    /// Drains and closes the stream.
    ///
    /// See [`StreamContext::quit`] for how each [`StopMode`] behaves.
    pub async fn quit(&self, mode: StopMode) -> Result<(), StreamAudioError> {
        let context = Arc::clone(&self.context);
        run_blocking(move || context.quit(mode)).await
    }

    /// Returns the underlying stream context.
    pub fn context(&self) -> &Arc<StreamContext> {
        &self.context
    }

    fn complete<T>(&self, value: T) -> Completion<T> {
        let status = self.context.take_error();
        if let Some(message) = &status {
            tracing::warn!("Audio stream status: {}", message);
        }
        Completion { value, status }
    }
}

impl Drop for AudioIo {
    fn drop(&mut self) {
        if matches!(
            self.context.state(),
            StreamState::Constructed | StreamState::Started
        ) {
            // Blocks until the backend stream is closed
            tracing::warn!("AudioIo dropped without quit; aborting stream");
            if let Err(e) = self.context.quit(StopMode::Abort) {
                tracing::warn!("Failed to abort audio stream: {}", e);
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StreamAudioError>
where
    F: FnOnce() -> Result<T, StreamAudioError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StreamAudioError::WorkerFailed {
            reason: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, StatusFlags, StreamEnd};
    use crate::{AudioOptions, SampleFormat};

    fn stereo16() -> AudioOptions {
        AudioOptions {
            sample_rate: 48000,
            sample_format: SampleFormat::Int16,
            max_queue: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_read_on_output_only_stream() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::output_only(stereo16())).unwrap();
        assert!(matches!(
            io.read(16).await,
            Err(StreamAudioError::InputNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_write_on_input_only_stream() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::input_only(stereo16())).unwrap();
        assert!(matches!(
            io.write(vec![0u8; 4]).await,
            Err(StreamAudioError::OutputNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_write_reaches_hardware() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::output_only(stereo16())).unwrap();
        io.start().unwrap();

        let done = io.write(vec![1u8, 2, 3, 4, 5, 6, 7, 8]).await.unwrap();
        assert_eq!(done.status, None);

        let (bytes, _) = backend.last_stream().unwrap().pull_output(2);
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_read_returns_data_with_status() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::input_only(stereo16())).unwrap();
        io.start().unwrap();

        let stream = backend.last_stream().unwrap();
        stream.process(Some(&[7u8; 8][..]), None, 2, StatusFlags::INPUT_OVERFLOW);

        let done = io.read(8).await.unwrap();
        assert_eq!(done.value.unwrap().as_bytes(), &[7; 8]);
        assert_eq!(done.status.as_deref(), Some("stream status - input overflow"));
    }

    #[tokio::test]
    async fn test_quit_releases_pending_read() {
        let backend = MockBackend::new();
        let io = Arc::new(
            AudioIo::open_with(&backend, StreamOptions::input_only(stereo16())).unwrap(),
        );
        io.start().unwrap();

        let reader = tokio::spawn({
            let io = Arc::clone(&io);
            async move { io.read(64).await }
        });

        io.quit(StopMode::Wait).await.unwrap();
        let done = reader.await.unwrap().unwrap();
        assert!(done.value.is_none());
        assert_eq!(io.context().state(), StreamState::Stopped);
    }

    #[tokio::test]
    async fn test_drop_aborts_running_stream() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::output_only(stereo16())).unwrap();
        io.start().unwrap();
        drop(io);

        let stream = backend.last_stream().unwrap();
        assert_eq!(stream.ended(), Some(StreamEnd::Aborted));
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_drop_after_async_quit_leaves_stream_alone() {
        let backend = MockBackend::new();
        let io = AudioIo::open_with(&backend, StreamOptions::output_only(stereo16())).unwrap();
        io.start().unwrap();
        io.quit(StopMode::Abort).await.unwrap();

        let context = Arc::clone(io.context());
        drop(io);

        let stream = backend.last_stream().unwrap();
        assert_eq!(stream.ended(), Some(StreamEnd::Aborted));
        assert!(stream.is_closed());
        assert_eq!(context.state(), StreamState::Stopped);
    }
}
