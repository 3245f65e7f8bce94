//! Device listing example.
//!
//! Prints every host API and device CPAL can see. Device ids shown here are
//! the values accepted by `AudioOptions::device_id`.
//!
//! Run with: cargo run --example list_devices

use stream_audio_io::{list_devices, list_host_apis};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Host APIs:");
    for api in list_host_apis()? {
        println!("  {api}");
    }

    println!("\nDevices:");
    for device in list_devices()? {
        println!("  {device}");
    }

    Ok(())
}
