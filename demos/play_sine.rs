//! Sine playback example.
//!
//! Plays a 440Hz tone on the default output device for two seconds, writing
//! it in 100ms pieces.
//!
//! Run with: cargo run --example play_sine

use std::f32::consts::TAU;

use stream_audio_io::{AudioIo, AudioOptions, SampleFormat, StopMode, StreamOptions};

const SAMPLE_RATE: u32 = 48000;
const CHANNELS: u16 = 2;
const FREQUENCY: f32 = 440.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let io = AudioIo::open(StreamOptions::output_only(AudioOptions {
        sample_rate: SAMPLE_RATE,
        channel_count: CHANNELS,
        sample_format: SampleFormat::Int16,
        max_queue: 4,
        ..Default::default()
    }))?;
    io.start()?;

    println!("Playing {FREQUENCY}Hz for 2 seconds...");

    let frames_per_piece = SAMPLE_RATE as usize / 10;
    let mut phase = 0.0f32;
    for _ in 0..20 {
        let mut bytes = Vec::with_capacity(frames_per_piece * CHANNELS as usize * 2);
        for _ in 0..frames_per_piece {
            let sample = (phase.sin() * 0.2 * i16::MAX as f32) as i16;
            for _ in 0..CHANNELS {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
            phase = (phase + TAU * FREQUENCY / SAMPLE_RATE as f32) % TAU;
        }

        let done = io.write(bytes).await?;
        if let Some(status) = done.status {
            println!("Status: {status}");
        }
    }

    // Let every queued byte play before closing the device
    io.quit(StopMode::Wait).await?;
    println!("Done");

    Ok(())
}
