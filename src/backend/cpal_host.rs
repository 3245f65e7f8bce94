//! CPAL backend for real audio hardware.
//!
//! CPAL streams are not `Send` on every platform, so each opened stream
//! lives on a dedicated owner thread. [`CpalStream`] forwards lifecycle
//! commands to that thread and waits for the reply.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, HostId, SampleRate, Stream, StreamConfig};

use super::{
    AudioBackend, BackendStream, DeviceCapabilities, DeviceInfo, DirectionParams, HostApiInfo,
    StatusFlags, StreamCallbacks, StreamParams,
};
use crate::config::{Direction, SampleFormat};
use crate::StreamAudioError;

/// Backend over the CPAL host audio library.
///
/// Device ids are indices into the host's device list, the same ids
/// reported by [`list_devices`](crate::list_devices).
#[derive(Debug, Clone, Copy)]
pub struct CpalBackend {
    host_id: HostId,
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalBackend {
    /// Uses the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    /// Uses a specific host API.
    pub fn with_host(host_id: HostId) -> Self {
        Self { host_id }
    }

    fn host(&self) -> Result<cpal::Host, StreamAudioError> {
        cpal::host_from_id(self.host_id).map_err(StreamAudioError::backend)
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        self.host_id.name()
    }

    fn device_capabilities(
        &self,
        direction: Direction,
        device_id: Option<usize>,
    ) -> Result<DeviceCapabilities, StreamAudioError> {
        let host = self.host()?;
        let device = resolve_device(&host, direction, device_id)?;
        Ok(DeviceCapabilities {
            name: device_name(&device),
            max_channels: max_channels(&device, direction),
            default_sample_rate: default_sample_rate(&device, direction).unwrap_or(0),
            // CPAL does not report device latencies
            default_low_latency: None,
            default_high_latency: None,
        })
    }

    fn open_stream(
        &self,
        params: &StreamParams,
        callbacks: StreamCallbacks,
    ) -> Result<Box<dyn BackendStream>, StreamAudioError> {
        // Reject formats CPAL cannot express before spawning anything
        for direction in params.input.iter().chain(params.output.iter()) {
            cpal_sample_format(direction.sample_format)?;
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel::<(Command, Reply)>();
        let host_id = self.host_id;
        let params = params.clone();

        let thread = thread::Builder::new()
            .name("stream-audio-io-cpal".to_string())
            .spawn(move || {
                let streams = match build_streams(host_id, &params, &callbacks) {
                    Ok(streams) => {
                        let _ = ready_tx.send(Ok(()));
                        streams
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for (command, reply) in command_rx {
                    let result = match command {
                        Command::Play => streams
                            .iter()
                            .try_for_each(StreamTrait::play)
                            .map_err(|e| StreamAudioError::StartFailed {
                                reason: e.to_string(),
                            }),
                        Command::Pause => streams
                            .iter()
                            .try_for_each(StreamTrait::pause)
                            .map_err(StreamAudioError::backend),
                    };
                    let _ = reply.send(result);
                }
                // Command channel closed: streams drop here and release the device
            })
            .map_err(StreamAudioError::backend)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(CpalStream {
                commands: Some(command_tx),
                thread: Some(thread),
            })),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(StreamAudioError::backend(
                    "stream thread exited before the stream was built",
                ))
            }
        }
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>, StreamAudioError> {
        let host = self.host()?;
        let devices = host.devices().map_err(StreamAudioError::backend)?;
        Ok(devices
            .enumerate()
            .map(|(id, device)| DeviceInfo {
                id,
                name: device_name(&device),
                max_input_channels: max_channels(&device, Direction::Input),
                max_output_channels: max_channels(&device, Direction::Output),
                default_sample_rate: default_sample_rate(&device, Direction::Output)
                    .or_else(|| default_sample_rate(&device, Direction::Input))
                    .unwrap_or(0),
                host_api: self.host_id.name().to_string(),
            })
            .collect())
    }

    fn host_apis(&self) -> Result<Vec<HostApiInfo>, StreamAudioError> {
        let default_id = cpal::default_host().id();
        Ok(cpal::available_hosts()
            .into_iter()
            .enumerate()
            .map(|(id, host_id)| {
                let device_count = cpal::host_from_id(host_id)
                    .ok()
                    .and_then(|host| host.devices().ok())
                    .map_or(0, Iterator::count);
                HostApiInfo {
                    id,
                    name: host_id.name().to_string(),
                    device_count,
                    is_default: host_id == default_id,
                }
            })
            .collect())
    }
}

type Reply = mpsc::Sender<Result<(), StreamAudioError>>;

#[derive(Debug, Clone, Copy)]
enum Command {
    Play,
    Pause,
}

/// Handle to CPAL streams living on their owner thread.
///
/// CPAL has no drain primitive, so `stop` and `abort` both pause the
/// hardware. Dropping the handle closes the streams.
struct CpalStream {
    commands: Option<mpsc::Sender<(Command, Reply)>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalStream {
    fn send(&self, command: Command) -> Result<(), StreamAudioError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| StreamAudioError::backend("stream is closed"))?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send((command, reply_tx))
            .map_err(|_| StreamAudioError::backend("stream thread has exited"))?;
        reply_rx
            .recv()
            .map_err(|_| StreamAudioError::backend("stream thread has exited"))?
    }
}

impl BackendStream for CpalStream {
    fn start(&mut self) -> Result<(), StreamAudioError> {
        self.send(Command::Play)
    }

    fn stop(&mut self) -> Result<(), StreamAudioError> {
        self.send(Command::Pause)
    }

    fn abort(&mut self) -> Result<(), StreamAudioError> {
        self.send(Command::Pause)
    }

    fn close(self: Box<Self>) {
        drop(self);
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        // Closing the channel ends the owner thread's command loop
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("CPAL stream thread panicked");
            }
        }
    }
}

fn build_streams(
    host_id: HostId,
    params: &StreamParams,
    callbacks: &StreamCallbacks,
) -> Result<Vec<Stream>, StreamAudioError> {
    let host = cpal::host_from_id(host_id).map_err(StreamAudioError::backend)?;
    let mut streams = Vec::with_capacity(2);

    if let Some(input) = &params.input {
        let device = resolve_device(&host, Direction::Input, input.device_id)?;
        let process = Arc::clone(&callbacks.process);
        let channels = usize::from(input.channel_count).max(1);
        let stream = device
            .build_input_stream_raw(
                &stream_config(input, params),
                cpal_sample_format(input.sample_format)?,
                move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                    let frames = data.len() / channels;
                    process(Some(data.bytes()), None, frames, StatusFlags::empty());
                },
                error_handler(callbacks, Direction::Input),
                None,
            )
            .map_err(StreamAudioError::backend)?;
        streams.push(stream);
    }

    if let Some(output) = &params.output {
        let device = resolve_device(&host, Direction::Output, output.device_id)?;
        let process = Arc::clone(&callbacks.process);
        let channels = usize::from(output.channel_count).max(1);
        let stream = device
            .build_output_stream_raw(
                &stream_config(output, params),
                cpal_sample_format(output.sample_format)?,
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    process(None, Some(data.bytes_mut()), frames, StatusFlags::empty());
                },
                error_handler(callbacks, Direction::Output),
                None,
            )
            .map_err(StreamAudioError::backend)?;
        streams.push(stream);
    }

    Ok(streams)
}

fn error_handler(
    callbacks: &StreamCallbacks,
    direction: Direction,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    let error = Arc::clone(&callbacks.error);
    move |err| {
        tracing::error!(%direction, "Audio stream error: {}", err);
        error(err.to_string());
    }
}

fn stream_config(direction: &DirectionParams, params: &StreamParams) -> StreamConfig {
    StreamConfig {
        channels: direction.channel_count,
        sample_rate: SampleRate(params.sample_rate),
        buffer_size: match params.frames_per_buffer {
            Some(frames) => BufferSize::Fixed(frames),
            None => BufferSize::Default,
        },
    }
}

fn cpal_sample_format(format: SampleFormat) -> Result<cpal::SampleFormat, StreamAudioError> {
    match format {
        SampleFormat::Int8 => Ok(cpal::SampleFormat::I8),
        SampleFormat::Int16 => Ok(cpal::SampleFormat::I16),
        SampleFormat::Int32 => Ok(cpal::SampleFormat::I32),
        // No packed 24-bit raw format in CPAL
        SampleFormat::Int24 => Err(StreamAudioError::UnsupportedSampleFormat {
            bits: format.bits(),
        }),
    }
}

fn resolve_device(
    host: &cpal::Host,
    direction: Direction,
    device_id: Option<usize>,
) -> Result<cpal::Device, StreamAudioError> {
    match device_id {
        None => match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        }
        .ok_or(StreamAudioError::NoDefaultDevice { direction }),
        Some(id) => host
            .devices()
            .map_err(StreamAudioError::backend)?
            .nth(id)
            .ok_or(StreamAudioError::DeviceNotFound { id }),
    }
}

fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

fn max_channels(device: &cpal::Device, direction: Direction) -> u16 {
    let max = match direction {
        Direction::Input => device
            .supported_input_configs()
            .ok()
            .and_then(|configs| configs.map(|c| c.channels()).max()),
        Direction::Output => device
            .supported_output_configs()
            .ok()
            .and_then(|configs| configs.map(|c| c.channels()).max()),
    };
    max.unwrap_or(0)
}

fn default_sample_rate(device: &cpal::Device, direction: Direction) -> Option<u32> {
    let config = match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    };
    config.ok().map(|c| c.sample_rate().0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_mapping() {
        assert_eq!(
            cpal_sample_format(SampleFormat::Int8).unwrap(),
            cpal::SampleFormat::I8
        );
        assert_eq!(
            cpal_sample_format(SampleFormat::Int16).unwrap(),
            cpal::SampleFormat::I16
        );
        assert_eq!(
            cpal_sample_format(SampleFormat::Int32).unwrap(),
            cpal::SampleFormat::I32
        );
    }

    #[test]
    fn test_packed_24_bit_rejected() {
        assert!(matches!(
            cpal_sample_format(SampleFormat::Int24),
            Err(StreamAudioError::UnsupportedSampleFormat { bits: 24 })
        ));
    }

    #[test]
    fn test_stream_config_buffer_size() {
        let direction = DirectionParams {
            device_id: None,
            channel_count: 2,
            sample_format: SampleFormat::Int16,
            suggested_latency: None,
        };
        let mut params = StreamParams {
            input: None,
            output: Some(direction.clone()),
            sample_rate: 48000,
            frames_per_buffer: Some(256),
        };
        let config = stream_config(&direction, &params);
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, SampleRate(48000));
        assert_eq!(config.buffer_size, BufferSize::Fixed(256));

        params.frames_per_buffer = None;
        assert_eq!(
            stream_config(&direction, &params).buffer_size,
            BufferSize::Default
        );
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_default_output_capabilities() {
        let backend = CpalBackend::new();
        let caps = backend
            .device_capabilities(Direction::Output, None)
            .unwrap();
        println!("Default output: {} ({} ch)", caps.name, caps.max_channels);
        assert!(caps.max_channels > 0);
    }
}
