use std::process;

use clap::Parser;

use song_identifier::capture::{format_device_list, selectable_devices};
use song_identifier::{AudioCapture, CpalCapture};

/// List the audio devices song_identifier can record from, numbered the
/// way the device prompt and `--device` expect them.
#[derive(Debug, Parser)]
#[command(name = "show_sources", version)]
struct Args {
    /// Also list devices without input channels
    #[arg(long, short = 'a', env = "DISPLAY_OUTPUT_DEVICES")]
    all: bool,
}

fn main() {
    let args = Args::parse();

    let devices = match CpalCapture::new().devices() {
        Ok(devices) => selectable_devices(devices, args.all),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if devices.is_empty() {
        println!("No audio input devices found.");
        println!("\nMake sure:");
        println!("  - the line-in or USB interface is connected");
        println!("  - the audio server (PulseAudio/PipeWire/CoreAudio) is running");
        println!("  - show_sources --all lists it among the output-only devices");
        process::exit(1);
    }

    println!("Available audio sources:\n");
    println!("{}", format_device_list(&devices));
}
