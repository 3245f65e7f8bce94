//! Stream context: binds the chunk pipeline to a hardware stream.
//!
//! The context owns one [`ChunkAssembler`] per configured direction and the
//! backend stream handle. Application threads call
//! [`pull_in_chunk`](StreamContext::pull_in_chunk) and
//! [`push_out_chunk`](StreamContext::push_out_chunk); the backend's realtime
//! thread calls [`process`](StreamContext::process) once per hardware buffer.
//!
//! # Shutdown
//!
//! [`quit`](StreamContext::quit) marks both queues inactive, which releases
//! any thread blocked on them. With [`StopMode::Wait`] and an output
//! direction it then blocks until the output callback has drained every
//! queued byte, so nothing written is lost.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::backend::{
    AudioBackend, BackendStream, CallbackResult, DirectionParams, StatusFlags, StreamCallbacks,
    StreamParams, ARM_FRAMES_PER_BUFFER,
};
use crate::config::{Direction, StopMode, StreamOptions};
use crate::pipeline::ChunkAssembler;
use crate::{Chunk, StreamAudioError};

/// Lifecycle state of a [`StreamContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Opened but not yet streaming.
    Constructed,
    /// The hardware is delivering callbacks.
    Started,
    /// `quit` is draining the queues.
    Quitting,
    /// The hardware stream is stopped and closed. Terminal.
    Stopped,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructed => f.write_str("constructed"),
            Self::Started => f.write_str("started"),
            Self::Quitting => f.write_str("quitting"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Result of one pass of the copy loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transfer {
    /// Bytes copied into the destination.
    copied: usize,
    /// The assembler drained before the destination was full.
    finished: bool,
}

/// Copies bytes out of `assembler` into `dest`, crossing chunk boundaries.
///
/// Blocks while the assembler's queue is active and empty.
fn copy_from_assembler(assembler: &ChunkAssembler, dest: &mut [u8]) -> Transfer {
    let mut guard = assembler.lock();
    let mut copied = 0;
    while copied < dest.len() {
        if !guard.advance_if_exhausted() {
            return Transfer {
                copied,
                finished: true,
            };
        }
        let available = &guard.current_buffer()[guard.current_offset()..];
        let n = available.len().min(dest.len() - copied);
        dest[copied..copied + n].copy_from_slice(&available[..n]);
        guard.advance_offset(n);
        copied += n;
    }
    Transfer {
        copied,
        finished: false,
    }
}

/// One audio stream: input, output, or full duplex.
///
/// Created with [`open`](Self::open), which returns an `Arc` because the
/// backend's realtime thread holds a weak reference to the context for as
/// long as the hardware stream is open.
///
/// # Example
///
/// ```
/// use stream_audio_io::backend::MockBackend;
/// use stream_audio_io::{AudioOptions, StopMode, StreamContext, StreamOptions};
///
/// let backend = MockBackend::new();
/// let context = StreamContext::open(
///     &backend,
///     StreamOptions::input_only(AudioOptions::default()),
/// )?;
/// context.start()?;
///
/// // The hardware delivers one 4-frame buffer (2 channels, 8-bit)
/// let stream = backend.last_stream().unwrap();
/// stream.push_input(&[1, 2, 3, 4, 5, 6, 7, 8], 4);
///
/// let chunk = context.pull_in_chunk(6)?.unwrap();
/// assert_eq!(chunk.as_bytes(), &[1, 2, 3, 4, 5, 6]);
///
/// context.quit(StopMode::Wait)?;
/// # Ok::<(), stream_audio_io::StreamAudioError>(())
/// ```
pub struct StreamContext {
    options: StreamOptions,
    input: Option<ChunkAssembler>,
    output: Option<ChunkAssembler>,
    stream: Mutex<Option<Box<dyn BackendStream>>>,
    state: Mutex<StreamState>,
    stopped: Condvar,
    abort_requested: AtomicBool,
    error: Mutex<Option<String>>,
    input_finished: AtomicBool,
    output_finished: Mutex<bool>,
    output_drained: Condvar,
}

impl StreamContext {
    /// Validates `options` and opens a hardware stream through `backend`.
    ///
    /// The stream is opened but not started.
    ///
    /// # Errors
    ///
    /// - `NoDirectionConfigured`, `SampleRateMismatch`, `InvalidQueueDepth`
    ///   if the options are inconsistent
    /// - `DeviceNotFound` / `NoDefaultDevice` if a device can't be resolved
    /// - `ChannelCountExceeded` if a device has too few channels
    /// - `UnsupportedSampleFormat` if the backend can't stream the bit depth
    /// - `BackendError` if the backend fails to open the stream
    pub fn open(
        backend: &dyn AudioBackend,
        options: StreamOptions,
    ) -> Result<Arc<Self>, StreamAudioError> {
        options.validate()?;

        let input = options
            .input
            .as_ref()
            .map(|o| direction_params(backend, Direction::Input, o))
            .transpose()?;
        let output = options
            .output
            .as_ref()
            .map(|o| direction_params(backend, Direction::Output, o))
            .transpose()?;
        let params = StreamParams {
            input,
            output,
            sample_rate: options.sample_rate().unwrap_or_default(),
            frames_per_buffer: cfg!(target_arch = "arm").then_some(ARM_FRAMES_PER_BUFFER),
        };

        let context = Arc::new(Self {
            input: options.input.as_ref().map(|o| ChunkAssembler::new(o.max_queue)),
            output: options.output.as_ref().map(|o| ChunkAssembler::new(o.max_queue)),
            options,
            stream: Mutex::new(None),
            state: Mutex::new(StreamState::Constructed),
            stopped: Condvar::new(),
            abort_requested: AtomicBool::new(false),
            error: Mutex::new(None),
            input_finished: AtomicBool::new(false),
            output_finished: Mutex::new(false),
            output_drained: Condvar::new(),
        });

        let stream = backend.open_stream(&params, context.callbacks())?;
        *context.stream.lock() = Some(stream);

        tracing::info!(
            backend = backend.name(),
            input = ?context.options.input.as_ref().map(ToString::to_string),
            output = ?context.options.output.as_ref().map(ToString::to_string),
            "Opened audio stream"
        );
        Ok(context)
    }

    /// Builds the backend callbacks. They hold only a weak reference so the
    /// stream handle inside the context doesn't keep the context alive.
    fn callbacks(self: &Arc<Self>) -> StreamCallbacks {
        let process_ctx: Weak<Self> = Arc::downgrade(self);
        let error_ctx = Weak::clone(&process_ctx);
        StreamCallbacks {
            process: Arc::new(
                move |input: Option<&[u8]>,
                      output: Option<&mut [u8]>,
                      frames: usize,
                      status: StatusFlags| {
                    match process_ctx.upgrade() {
                        Some(context) => context.process(input, output, frames, status),
                        None => {
                            if let Some(buffer) = output {
                                buffer.fill(0);
                            }
                            CallbackResult::Complete
                        }
                    }
                },
            ),
            error: Arc::new(move |message: String| {
                if let Some(context) = error_ctx.upgrade() {
                    context.record_error(message);
                }
            }),
        }
    }

    /// Starts hardware streaming.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the stream was already started or has quit
    /// - `StartFailed` if the hardware refuses to start
    pub fn start(&self) -> Result<(), StreamAudioError> {
        let mut state = self.state.lock();
        if *state != StreamState::Constructed {
            return Err(StreamAudioError::InvalidState {
                operation: "start",
                state: *state,
            });
        }

        match self.stream.lock().as_mut() {
            Some(stream) => stream.start()?,
            None => {
                return Err(StreamAudioError::StartFailed {
                    reason: "hardware stream is not open".to_string(),
                })
            }
        }

        *state = StreamState::Started;
        tracing::info!("Audio stream started");
        Ok(())
    }

    /// Reads up to `size` captured bytes.
    ///
    /// Blocks until `size` bytes are available or the input has drained
    /// after [`quit`](Self::quit). Returns a shorter chunk near the end of
    /// the stream and `None` once nothing is left. A zero-byte read never
    /// blocks and yields an empty chunk until the input has drained.
    ///
    /// # Errors
    ///
    /// `InputNotConfigured` if the stream has no input direction.
    pub fn pull_in_chunk(&self, size: usize) -> Result<Option<Chunk>, StreamAudioError> {
        let assembler = self
            .input
            .as_ref()
            .ok_or(StreamAudioError::InputNotConfigured)?;
        if size == 0 {
            return Ok((!assembler.is_exhausted()).then(|| Chunk::new(Vec::new())));
        }

        let mut bytes = vec![0u8; size];
        let transfer = copy_from_assembler(assembler, &mut bytes);
        if transfer.copied == 0 {
            return Ok(None);
        }
        bytes.truncate(transfer.copied);
        Ok(Some(Chunk::new(bytes)))
    }

    /// Queues `chunk` for playback.
    ///
    /// Blocks only while the output queue is full.
    ///
    /// # Errors
    ///
    /// `OutputNotConfigured` if the stream has no output direction.
    pub fn push_out_chunk(&self, chunk: Chunk) -> Result<(), StreamAudioError> {
        let assembler = self
            .output
            .as_ref()
            .ok_or(StreamAudioError::OutputNotConfigured)?;
        if !assembler.is_active() {
            tracing::warn!(
                bytes = chunk.len(),
                "Write after quit; the chunk will not be played"
            );
        }
        assembler.push(chunk);
        Ok(())
    }

    /// Services one hardware buffer. Called from the realtime thread.
    ///
    /// `input` holds captured bytes, `output` the buffer to fill; either may
    /// be absent when the backend drives the directions separately. Returns
    /// [`CallbackResult::Complete`] once every configured direction has
    /// finished.
    pub fn process(
        &self,
        input: Option<&[u8]>,
        output: Option<&mut [u8]>,
        frames: usize,
        status: StatusFlags,
    ) -> CallbackResult {
        self.check_status(status);

        if let Some(captured) = input {
            self.read_hardware_buffer(captured, frames);
        }
        if let Some(buffer) = output {
            self.fill_hardware_buffer(buffer, frames);
        }

        let input_done = self.input.is_none() || self.input_finished.load(Ordering::Acquire);
        let output_done = self.output.is_none() || *self.output_finished.lock();
        if input_done && output_done {
            CallbackResult::Complete
        } else {
            CallbackResult::Continue
        }
    }

    fn read_hardware_buffer(&self, captured: &[u8], frames: usize) {
        let (Some(assembler), Some(options)) = (&self.input, &self.options.input) else {
            return;
        };
        if self.input_finished.load(Ordering::Acquire) {
            return;
        }
        if !assembler.is_active() {
            self.input_finished.store(true, Ordering::Release);
            return;
        }
        let len = options.bytes_for_frames(frames).min(captured.len());
        assembler.push(Chunk::copy_from_slice(&captured[..len]));
    }

    fn fill_hardware_buffer(&self, buffer: &mut [u8], frames: usize) {
        let (Some(assembler), Some(options)) = (&self.output, &self.options.output) else {
            buffer.fill(0);
            return;
        };
        if *self.output_finished.lock() {
            buffer.fill(0);
            return;
        }
        let len = options.bytes_for_frames(frames).min(buffer.len());
        let transfer = copy_from_assembler(assembler, &mut buffer[..len]);
        buffer[transfer.copied..].fill(0);
        if transfer.finished {
            self.finish_output();
        }
    }

    fn finish_output(&self) {
        let mut finished = self.output_finished.lock();
        if !*finished {
            *finished = true;
            self.output_drained.notify_all();
            tracing::debug!("Output drained");
        }
    }

    /// Records a description of the backend status `flags`, if any are set.
    ///
    /// The message replaces any unread one.
    pub fn check_status(&self, flags: StatusFlags) {
        if flags.is_empty() {
            return;
        }
        self.record_error(format!("stream status - {flags}"));
    }

    fn record_error(&self, message: String) {
        *self.error.lock() = Some(message);
    }

    /// Takes the pending status message, clearing it.
    pub fn take_error(&self) -> Option<String> {
        self.error.lock().take()
    }

    /// Drains the queues, then stops and closes the hardware stream.
    ///
    /// With [`StopMode::Wait`] on a started stream with output, blocks until
    /// the output callback has played every queued byte. With
    /// [`StopMode::Abort`] queued output is discarded.
    ///
    /// A second `quit` while one is in progress waits for the stream to
    /// stop. With [`StopMode::Abort`] it first discards queued output and
    /// releases a pending [`StopMode::Wait`], so an abort always ends a
    /// stuck drain. On a stopped stream `quit` does nothing.
    ///
    /// # Errors
    ///
    /// `BackendError` if the hardware fails to stop. The stream is closed
    /// and marked stopped regardless.
    pub fn quit(&self, mode: StopMode) -> Result<(), StreamAudioError> {
        let previous = {
            let mut state = self.state.lock();
            match *state {
                StreamState::Stopped => return Ok(()),
                StreamState::Quitting => None,
                current => {
                    *state = StreamState::Quitting;
                    Some(current)
                }
            }
        };
        let Some(previous) = previous else {
            if mode == StopMode::Abort {
                tracing::info!("Escalating quit in progress to abort");
                self.abort_requested.store(true, Ordering::Release);
                self.discard_output();
            }
            self.wait_until_stopped();
            return Ok(());
        };
        tracing::info!(%mode, state = %previous, "Quitting audio stream");

        self.drain_queues();

        let mut stream = self.stream.lock().take();
        let result = match mode {
            StopMode::Wait => {
                if previous == StreamState::Started && self.output.is_some() {
                    self.wait_for_output_drain();
                }
                if self.abort_requested.load(Ordering::Acquire) {
                    stream.as_mut().map_or(Ok(()), |s| s.abort())
                } else {
                    stream.as_mut().map_or(Ok(()), |s| s.stop())
                }
            }
            StopMode::Abort => {
                self.discard_output();
                stream.as_mut().map_or(Ok(()), |s| s.abort())
            }
        };
        if let Some(stream) = stream {
            stream.close();
        }

        *self.state.lock() = StreamState::Stopped;
        self.stopped.notify_all();
        tracing::info!("Audio stream stopped");
        result
    }

    /// Flushes queued output and marks output finished, waking a drain wait.
    fn discard_output(&self) {
        if let Some(output) = &self.output {
            let discarded = output.flush();
            tracing::debug!(discarded, "Discarded queued output");
        }
        self.finish_output();
    }

    fn wait_until_stopped(&self) {
        let mut state = self.state.lock();
        while *state != StreamState::Stopped {
            self.stopped.wait(&mut state);
        }
    }

    fn drain_queues(&self) {
        for assembler in self.input.iter().chain(self.output.iter()) {
            assembler.quit();
        }
    }

    fn wait_for_output_drain(&self) {
        let mut finished = self.output_finished.lock();
        while !*finished {
            self.output_drained.wait(&mut finished);
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Returns the options the stream was opened with.
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Returns `true` if the stream captures audio.
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Returns `true` if the stream plays audio.
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Returns the number of chunks waiting in a direction's queue.
    ///
    /// The chunk currently being consumed is not counted. Returns 0 for an
    /// unconfigured direction.
    pub fn queued(&self, direction: Direction) -> usize {
        let assembler = match direction {
            Direction::Input => self.input.as_ref(),
            Direction::Output => self.output.as_ref(),
        };
        assembler.map_or(0, ChunkAssembler::queued)
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.get_mut().take() {
            tracing::warn!("Audio stream dropped without quit; aborting");
            if let Err(e) = stream.abort() {
                tracing::warn!("Failed to abort audio stream: {}", e);
            }
            stream.close();
        }
    }
}

fn direction_params(
    backend: &dyn AudioBackend,
    direction: Direction,
    options: &crate::AudioOptions,
) -> Result<DirectionParams, StreamAudioError> {
    let caps = backend.device_capabilities(direction, options.device_id)?;
    if options.channel_count > caps.max_channels {
        return Err(StreamAudioError::ChannelCountExceeded {
            requested: options.channel_count,
            max: caps.max_channels,
            direction,
            device: caps.name,
        });
    }
    tracing::debug!(%direction, device = %caps.name, "Resolved audio device");

    let suggested_latency = if cfg!(target_arch = "arm") {
        caps.default_high_latency
    } else {
        caps.default_low_latency
    };
    Ok(DirectionParams {
        device_id: options.device_id,
        channel_count: options.channel_count,
        sample_format: options.sample_format,
        suggested_latency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockDevice, StreamEnd};
    use crate::{AudioOptions, SampleFormat};

    fn stereo16(max_queue: usize) -> AudioOptions {
        AudioOptions {
            sample_rate: 48000,
            channel_count: 2,
            sample_format: SampleFormat::Int16,
            max_queue,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_records_params() {
        let backend = MockBackend::new();
        let _context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(4))).unwrap();

        let stream = backend.last_stream().unwrap();
        let params = stream.params();
        assert!(params.input.is_none());
        let output = params.output.as_ref().unwrap();
        assert_eq!(output.channel_count, 2);
        assert_eq!(output.sample_format, SampleFormat::Int16);
        assert_eq!(params.sample_rate, 48000);
    }

    #[test]
    fn test_open_rejects_too_many_channels() {
        let backend = MockBackend::with_devices(vec![MockDevice::duplex("Mono", 1)]);
        let result = StreamContext::open(&backend, StreamOptions::output_only(stereo16(2)));
        assert!(matches!(
            result,
            Err(StreamAudioError::ChannelCountExceeded {
                requested: 2,
                max: 1,
                ..
            })
        ));
        assert!(backend.streams().is_empty());
    }

    #[test]
    fn test_open_rejects_unknown_device() {
        let backend = MockBackend::new();
        let options = StreamOptions::input_only(AudioOptions::default().with_device(5));
        assert!(matches!(
            StreamContext::open(&backend, options),
            Err(StreamAudioError::DeviceNotFound { id: 5 })
        ));
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        context.start().unwrap();
        assert_eq!(context.state(), StreamState::Started);
        assert!(matches!(
            context.start(),
            Err(StreamAudioError::InvalidState {
                operation: "start",
                state: StreamState::Started
            })
        ));
    }

    #[test]
    fn test_failed_start_keeps_stream_constructed() {
        let backend = MockBackend::new().failing_start();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        assert!(matches!(
            context.start(),
            Err(StreamAudioError::StartFailed { .. })
        ));
        assert_eq!(context.state(), StreamState::Constructed);
        context.quit(StopMode::Wait).unwrap();
        assert_eq!(context.state(), StreamState::Stopped);
    }

    #[test]
    fn test_quit_without_start_does_not_wait() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        context.push_out_chunk(Chunk::new(vec![1, 2, 3, 4])).unwrap();

        context.quit(StopMode::Wait).unwrap();

        let stream = backend.last_stream().unwrap();
        assert_eq!(context.state(), StreamState::Stopped);
        assert_eq!(stream.ended(), Some(StreamEnd::Stopped));
        assert!(stream.is_closed());
    }

    #[test]
    fn test_stopped_stream_cannot_restart() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::input_only(stereo16(2))).unwrap();
        context.quit(StopMode::Abort).unwrap();
        assert!(matches!(
            context.start(),
            Err(StreamAudioError::InvalidState {
                state: StreamState::Stopped,
                ..
            })
        ));
        // Repeated quit is a no-op
        context.quit(StopMode::Wait).unwrap();
    }

    #[test]
    fn test_output_pads_with_silence_after_drain() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(4))).unwrap();
        context.push_out_chunk(Chunk::new(vec![9; 6])).unwrap();
        context.drain_queues();

        let stream = backend.last_stream().unwrap();
        let (bytes, result) = stream.pull_output(2);
        assert_eq!(bytes, vec![9, 9, 9, 9, 9, 9, 0, 0]);
        assert_eq!(result, CallbackResult::Complete);

        // Finished output stays silent
        let (bytes, _) = stream.pull_output(1);
        assert_eq!(bytes, vec![0; 4]);
    }

    #[test]
    fn test_abort_discards_queued_output() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(4))).unwrap();
        context.start().unwrap();
        context.push_out_chunk(Chunk::new(vec![1; 4])).unwrap();
        context.push_out_chunk(Chunk::new(vec![2; 4])).unwrap();

        context.quit(StopMode::Abort).unwrap();

        let stream = backend.last_stream().unwrap();
        assert_eq!(stream.ended(), Some(StreamEnd::Aborted));
        assert_eq!(context.queued(Direction::Output), 0);
        let (bytes, _) = stream.pull_output(1);
        assert_eq!(bytes, vec![0; 4]);
    }

    #[test]
    fn test_abort_releases_waiting_quit() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(4))).unwrap();
        context.start().unwrap();
        context.push_out_chunk(Chunk::new(vec![1; 4])).unwrap();

        // No callbacks run, so the drain never completes on its own
        let waiter = {
            let context = Arc::clone(&context);
            std::thread::spawn(move || context.quit(StopMode::Wait))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));

        context.quit(StopMode::Abort).unwrap();
        assert_eq!(context.state(), StreamState::Stopped);
        waiter.join().unwrap().unwrap();

        let stream = backend.last_stream().unwrap();
        assert_eq!(stream.ended(), Some(StreamEnd::Aborted));
        assert!(stream.is_closed());
        assert_eq!(context.queued(Direction::Output), 0);
    }

    #[test]
    fn test_second_quit_waits_for_stop() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(4))).unwrap();
        context.start().unwrap();
        context.push_out_chunk(Chunk::new(vec![3; 4])).unwrap();

        let first = {
            let context = Arc::clone(&context);
            std::thread::spawn(move || context.quit(StopMode::Wait))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        let second = {
            let context = Arc::clone(&context);
            std::thread::spawn(move || {
                context.quit(StopMode::Wait).unwrap();
                context.state()
            })
        };

        let stream = backend.last_stream().unwrap();
        let (bytes, result) = stream.pull_output(2);
        assert_eq!(bytes, vec![3, 3, 3, 3, 0, 0, 0, 0]);
        assert_eq!(result, CallbackResult::Complete);

        first.join().unwrap().unwrap();
        assert_eq!(second.join().unwrap(), StreamState::Stopped);
        assert_eq!(stream.ended(), Some(StreamEnd::Stopped));
    }

    #[test]
    fn test_zero_byte_read_is_not_end_of_stream() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::input_only(stereo16(4))).unwrap();
        context.start().unwrap();
        let stream = backend.last_stream().unwrap();
        stream.push_input(&[1, 2, 3, 4], 1);

        let empty = context.pull_in_chunk(0).unwrap().unwrap();
        assert!(empty.is_empty());
        assert_eq!(
            context.pull_in_chunk(4).unwrap().unwrap().as_bytes(),
            &[1, 2, 3, 4]
        );

        context.quit(StopMode::Wait).unwrap();
        assert!(context.pull_in_chunk(8).unwrap().is_none());
        assert!(context.pull_in_chunk(0).unwrap().is_none());
    }

    #[test]
    fn test_input_finishes_after_quit() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::input_only(stereo16(4))).unwrap();
        let stream = backend.last_stream().unwrap();

        assert_eq!(stream.push_input(&[1; 4], 1), CallbackResult::Continue);
        context.quit(StopMode::Wait).unwrap();
        assert_eq!(stream.push_input(&[2; 4], 1), CallbackResult::Complete);

        // Only the pre-quit buffer was captured
        assert_eq!(context.pull_in_chunk(8).unwrap().unwrap().as_bytes(), &[1; 4]);
        assert!(context.pull_in_chunk(8).unwrap().is_none());
    }

    #[test]
    fn test_input_copies_only_frame_bytes() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::input_only(stereo16(4))).unwrap();
        let stream = backend.last_stream().unwrap();

        // One frame is 4 bytes; trailing bytes are not part of the buffer
        stream.push_input(&[1, 2, 3, 4, 5, 6], 1);
        assert_eq!(context.queued(Direction::Input), 1);
        context.quit(StopMode::Wait).unwrap();
        assert_eq!(
            context.pull_in_chunk(16).unwrap().unwrap().as_bytes(),
            &[1, 2, 3, 4]
        );
    }

    #[test]
    fn test_status_flags_recorded() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        let stream = backend.last_stream().unwrap();
        context.push_out_chunk(Chunk::new(vec![0; 4])).unwrap();

        stream.pull_output_with_status(1, StatusFlags::OUTPUT_UNDERFLOW);
        assert_eq!(
            context.take_error().as_deref(),
            Some("stream status - output underflow")
        );
        assert_eq!(context.take_error(), None);
    }

    #[test]
    fn test_status_last_write_wins() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        context.check_status(StatusFlags::INPUT_OVERFLOW);
        context.check_status(StatusFlags::empty());
        context.check_status(StatusFlags::PRIMING_OUTPUT);
        assert_eq!(
            context.take_error().as_deref(),
            Some("stream status - priming output")
        );
    }

    #[test]
    fn test_backend_error_recorded() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        backend.last_stream().unwrap().report_error("device unplugged");
        assert_eq!(context.take_error().as_deref(), Some("device unplugged"));
    }

    #[test]
    fn test_direction_misuse() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        assert!(matches!(
            context.pull_in_chunk(4),
            Err(StreamAudioError::InputNotConfigured)
        ));
        assert!(!context.has_input());
        assert!(context.has_output());
    }

    #[test]
    fn test_callbacks_after_drop_are_silent() {
        let backend = MockBackend::new();
        let context =
            StreamContext::open(&backend, StreamOptions::output_only(stereo16(2))).unwrap();
        let stream = backend.last_stream().unwrap();
        drop(context);

        assert_eq!(stream.ended(), Some(StreamEnd::Aborted));
        let (bytes, result) = stream.pull_output(1);
        assert_eq!(bytes, vec![0; 4]);
        assert_eq!(result, CallbackResult::Complete);
    }
}
