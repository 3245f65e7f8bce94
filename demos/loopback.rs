//! Loopback example.
//!
//! Opens a duplex stream on the default devices and plays captured audio
//! straight back out for five seconds. Use headphones to avoid feedback.
//!
//! Run with: cargo run --example loopback

use std::time::Duration;

use stream_audio_io::{AudioIo, AudioOptions, SampleFormat, StopMode, StreamOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let options = AudioOptions {
        sample_rate: 48000,
        channel_count: 1,
        sample_format: SampleFormat::Int16,
        max_queue: 8,
        ..Default::default()
    };
    let io = AudioIo::open(StreamOptions::duplex(options.clone(), options.clone()))?;
    io.start()?;

    println!("Looping input to output for 5 seconds...");

    // 20ms per read
    let read_size = options.bytes_for_frames(options.sample_rate as usize / 50);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut total = 0usize;

    while tokio::time::Instant::now() < deadline {
        let read = io.read(read_size).await?;
        if let Some(status) = &read.status {
            println!("Status: {status}");
        }
        let Some(chunk) = read.value else {
            break;
        };
        total += chunk.len();
        io.write(chunk).await?;
    }

    io.quit(StopMode::Abort).await?;
    println!("Looped {total} bytes");

    Ok(())
}
