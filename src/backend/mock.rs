//! Mock audio backend for testing without hardware.
//!
//! Streams opened here never run on their own. Tests play the role of the
//! audio thread by calling [`MockStreamHandle::pull_output`] and
//! [`MockStreamHandle::push_input`], which invoke the stream callbacks
//! synchronously on the calling thread.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    AudioBackend, BackendStream, CallbackResult, DeviceCapabilities, DeviceInfo, HostApiInfo,
    StatusFlags, StreamCallbacks, StreamParams,
};
use crate::config::Direction;
use crate::StreamAudioError;

const MOCK_HOST_API: &str = "Mock";
const MOCK_LOW_LATENCY: Duration = Duration::from_millis(10);
const MOCK_HIGH_LATENCY: Duration = Duration::from_millis(100);

/// A fake device exposed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    /// Device name.
    pub name: String,
    /// Maximum capture channels.
    pub max_input_channels: u16,
    /// Maximum playback channels.
    pub max_output_channels: u16,
    /// Default sample rate.
    pub default_sample_rate: u32,
}

impl MockDevice {
    /// A device that can both capture and play `channels` channels.
    pub fn duplex(name: impl Into<String>, channels: u16) -> Self {
        Self {
            name: name.into(),
            max_input_channels: channels,
            max_output_channels: channels,
            default_sample_rate: 48000,
        }
    }

    /// A capture-only device.
    pub fn input(name: impl Into<String>, channels: u16) -> Self {
        Self {
            max_output_channels: 0,
            ..Self::duplex(name, channels)
        }
    }

    /// A playback-only device.
    pub fn output(name: impl Into<String>, channels: u16) -> Self {
        Self {
            max_input_channels: 0,
            ..Self::duplex(name, channels)
        }
    }

    fn max_channels(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Input => self.max_input_channels,
            Direction::Output => self.max_output_channels,
        }
    }
}

/// How a mock stream was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// [`BackendStream::stop`] was called.
    Stopped,
    /// [`BackendStream::abort`] was called.
    Aborted,
}

#[derive(Debug, Default)]
struct MockStreamState {
    running: bool,
    ended: Option<StreamEnd>,
    closed: bool,
    completed: bool,
}

/// A backend whose streams are driven by the test.
///
/// # Example
///
/// ```
/// use stream_audio_io::backend::MockBackend;
/// use stream_audio_io::{AudioOptions, StreamContext, StreamOptions, SampleFormat};
///
/// let backend = MockBackend::new();
/// let options = StreamOptions::output_only(AudioOptions {
///     sample_format: SampleFormat::Int16,
///     ..Default::default()
/// });
/// let context = StreamContext::open(&backend, options).unwrap();
/// context.push_out_chunk(vec![1, 2, 3, 4].into()).unwrap();
///
/// // Play the audio thread: pull one frame (2 channels x 16 bits)
/// let stream = backend.last_stream().unwrap();
/// let (bytes, _) = stream.pull_output(1);
/// assert_eq!(bytes, vec![1, 2, 3, 4]);
/// ```
pub struct MockBackend {
    devices: Vec<MockDevice>,
    default_input: Option<usize>,
    default_output: Option<usize>,
    fail_start: bool,
    streams: Mutex<Vec<MockStreamHandle>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a backend with a single stereo duplex device.
    pub fn new() -> Self {
        Self::with_devices(vec![MockDevice::duplex("Mock Duplex", 2)])
    }

    /// Creates a backend with the given devices.
    ///
    /// The first device able to capture is the default input; the first
    /// able to play is the default output.
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let default_input = devices.iter().position(|d| d.max_input_channels > 0);
        let default_output = devices.iter().position(|d| d.max_output_channels > 0);
        Self {
            devices,
            default_input,
            default_output,
            fail_start: false,
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Makes every stream opened by this backend refuse to start.
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Returns handles to every stream opened so far.
    pub fn streams(&self) -> Vec<MockStreamHandle> {
        self.streams.lock().clone()
    }

    /// Returns the most recently opened stream.
    pub fn last_stream(&self) -> Option<MockStreamHandle> {
        self.streams.lock().last().cloned()
    }

    fn resolve(
        &self,
        direction: Direction,
        device_id: Option<usize>,
    ) -> Result<&MockDevice, StreamAudioError> {
        let index = match device_id {
            Some(id) => id,
            None => match direction {
                Direction::Input => self.default_input,
                Direction::Output => self.default_output,
            }
            .ok_or(StreamAudioError::NoDefaultDevice { direction })?,
        };
        self.devices
            .get(index)
            .ok_or(StreamAudioError::DeviceNotFound { id: index })
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn device_capabilities(
        &self,
        direction: Direction,
        device_id: Option<usize>,
    ) -> Result<DeviceCapabilities, StreamAudioError> {
        let device = self.resolve(direction, device_id)?;
        Ok(DeviceCapabilities {
            name: device.name.clone(),
            max_channels: device.max_channels(direction),
            default_sample_rate: device.default_sample_rate,
            default_low_latency: Some(MOCK_LOW_LATENCY),
            default_high_latency: Some(MOCK_HIGH_LATENCY),
        })
    }

    fn open_stream(
        &self,
        params: &StreamParams,
        callbacks: StreamCallbacks,
    ) -> Result<Box<dyn BackendStream>, StreamAudioError> {
        let state = Arc::new(Mutex::new(MockStreamState::default()));
        self.streams.lock().push(MockStreamHandle {
            params: params.clone(),
            callbacks,
            state: Arc::clone(&state),
        });
        Ok(Box::new(MockStream {
            state,
            fail_start: self.fail_start,
        }))
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>, StreamAudioError> {
        Ok(self
            .devices
            .iter()
            .enumerate()
            .map(|(id, device)| DeviceInfo {
                id,
                name: device.name.clone(),
                max_input_channels: device.max_input_channels,
                max_output_channels: device.max_output_channels,
                default_sample_rate: device.default_sample_rate,
                host_api: MOCK_HOST_API.to_string(),
            })
            .collect())
    }

    fn host_apis(&self) -> Result<Vec<HostApiInfo>, StreamAudioError> {
        Ok(vec![HostApiInfo {
            id: 0,
            name: MOCK_HOST_API.to_string(),
            device_count: self.devices.len(),
            is_default: true,
        }])
    }
}

struct MockStream {
    state: Arc<Mutex<MockStreamState>>,
    fail_start: bool,
}

impl BackendStream for MockStream {
    fn start(&mut self) -> Result<(), StreamAudioError> {
        if self.fail_start {
            return Err(StreamAudioError::StartFailed {
                reason: "mock device refused to start".to_string(),
            });
        }
        self.state.lock().running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StreamAudioError> {
        let mut state = self.state.lock();
        state.running = false;
        state.ended = Some(StreamEnd::Stopped);
        Ok(())
    }

    fn abort(&mut self) -> Result<(), StreamAudioError> {
        let mut state = self.state.lock();
        state.running = false;
        state.ended = Some(StreamEnd::Aborted);
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.state.lock().closed = true;
    }
}

/// Test-side handle to a stream opened by [`MockBackend`].
#[derive(Clone)]
pub struct MockStreamHandle {
    params: StreamParams,
    callbacks: StreamCallbacks,
    state: Arc<Mutex<MockStreamState>>,
}

impl MockStreamHandle {
    /// Returns the parameters the stream was opened with.
    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Runs one output callback for `frames` frames and returns the bytes played.
    ///
    /// Returns an empty buffer if the stream has no output direction.
    pub fn pull_output(&self, frames: usize) -> (Vec<u8>, CallbackResult) {
        self.pull_output_with_status(frames, StatusFlags::empty())
    }

    /// Like [`pull_output`](Self::pull_output), reporting `status` to the callback.
    pub fn pull_output_with_status(
        &self,
        frames: usize,
        status: StatusFlags,
    ) -> (Vec<u8>, CallbackResult) {
        let frame_bytes = self
            .params
            .output
            .as_ref()
            .map_or(0, |p| p.channel_count as usize * p.sample_format.bytes_per_sample());
        let mut buffer = vec![0xAA; frames * frame_bytes];
        let result = self.process(None, Some(&mut buffer), frames, status);
        (buffer, result)
    }

    /// Runs one input callback delivering `bytes` as `frames` captured frames.
    pub fn push_input(&self, bytes: &[u8], frames: usize) -> CallbackResult {
        self.process(Some(bytes), None, frames, StatusFlags::empty())
    }

    /// Runs one callback with explicit buffers, as a duplex host would.
    pub fn process(
        &self,
        input: Option<&[u8]>,
        output: Option<&mut [u8]>,
        frames: usize,
        status: StatusFlags,
    ) -> CallbackResult {
        let result = (self.callbacks.process)(input, output, frames, status);
        if result == CallbackResult::Complete {
            self.state.lock().completed = true;
        }
        result
    }

    /// Reports an asynchronous stream error, as a host would on device loss.
    pub fn report_error(&self, message: impl Into<String>) {
        (self.callbacks.error)(message.into());
    }

    /// Returns `true` between `start` and `stop`/`abort`.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Returns how the stream was stopped, if it was.
    pub fn ended(&self) -> Option<StreamEnd> {
        self.state.lock().ended
    }

    /// Returns `true` once the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns `true` once a callback has returned [`CallbackResult::Complete`].
    pub fn has_completed(&self) -> bool {
        self.state.lock().completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callbacks(calls: Arc<AtomicUsize>) -> StreamCallbacks {
        StreamCallbacks {
            process: Arc::new(
                move |_: Option<&[u8]>, output: Option<&mut [u8]>, _: usize, _: StatusFlags| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if let Some(out) = output {
                        out.fill(0);
                    }
                    CallbackResult::Complete
                },
            ),
            error: Arc::new(|_: String| {}),
        }
    }

    fn params() -> StreamParams {
        StreamParams {
            input: None,
            output: Some(crate::backend::DirectionParams {
                device_id: None,
                channel_count: 2,
                sample_format: crate::SampleFormat::Int16,
                suggested_latency: None,
            }),
            sample_rate: 48000,
            frames_per_buffer: None,
        }
    }

    #[test]
    fn test_default_devices() {
        let backend = MockBackend::with_devices(vec![
            MockDevice::output("Speakers", 2),
            MockDevice::input("Mic", 1),
        ]);
        let input = backend.device_capabilities(Direction::Input, None).unwrap();
        let output = backend.device_capabilities(Direction::Output, None).unwrap();
        assert_eq!(input.name, "Mic");
        assert_eq!(input.max_channels, 1);
        assert_eq!(output.name, "Speakers");
    }

    #[test]
    fn test_unknown_device() {
        let backend = MockBackend::new();
        let result = backend.device_capabilities(Direction::Output, Some(7));
        assert!(matches!(
            result,
            Err(StreamAudioError::DeviceNotFound { id: 7 })
        ));
    }

    #[test]
    fn test_no_default_input() {
        let backend = MockBackend::with_devices(vec![MockDevice::output("Speakers", 2)]);
        let result = backend.device_capabilities(Direction::Input, None);
        assert!(matches!(
            result,
            Err(StreamAudioError::NoDefaultDevice {
                direction: Direction::Input
            })
        ));
    }

    #[test]
    fn test_stream_lifecycle() {
        let backend = MockBackend::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = backend
            .open_stream(&params(), counting_callbacks(Arc::clone(&calls)))
            .unwrap();
        let handle = backend.last_stream().unwrap();

        stream.start().unwrap();
        assert!(handle.is_running());

        let (bytes, result) = handle.pull_output(4);
        assert_eq!(bytes.len(), 16);
        assert_eq!(result, CallbackResult::Complete);
        assert!(handle.has_completed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        stream.abort().unwrap();
        assert_eq!(handle.ended(), Some(StreamEnd::Aborted));
        stream.close();
        assert!(handle.is_closed());
    }

    #[test]
    fn test_failing_start() {
        let backend = MockBackend::new().failing_start();
        let mut stream = backend
            .open_stream(&params(), counting_callbacks(Arc::new(AtomicUsize::new(0))))
            .unwrap();
        assert!(matches!(
            stream.start(),
            Err(StreamAudioError::StartFailed { .. })
        ));
    }

    #[test]
    fn test_device_listing() {
        let backend = MockBackend::with_devices(vec![
            MockDevice::duplex("A", 2),
            MockDevice::output("B", 8),
        ]);
        let devices = backend.devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].id, 1);
        assert_eq!(devices[1].max_output_channels, 8);
        assert_eq!(devices[1].max_input_channels, 0);

        let apis = backend.host_apis().unwrap();
        assert_eq!(apis[0].device_count, 2);
        assert!(apis[0].is_default);
    }
}
