// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loopmix::audio;
use loopmix::clock::SystemClock;
use loopmix::config;
use loopmix::controller::{keyboard, tick_forwarder, Controller};
use loopmix::coordinator::Coordinator;
use loopmix::samples::SampleStore;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A beat-synchronized loop mixer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists and verifies every sample in the catalog.
    Samples {
        /// The path to the mixer config. The built-in catalog is used if omitted.
        config_path: Option<String>,
    },
    /// Starts the mixer, controlled from the keyboard.
    Start {
        /// The path to the mixer config. The built-in catalog is used if omitted.
        config_path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Samples { config_path } => {
            let config_path = config_path.map(PathBuf::from);
            let (config, base_path) = config::load(config_path.as_deref())?;
            let sample_rate = config
                .audio()
                .sample_rate()
                .unwrap_or(audio::mock::DEFAULT_SAMPLE_RATE);
            let mut store = SampleStore::new(config.samples().to_vec(), &base_path, sample_rate);

            println!("Samples (count: {}):", config.samples().len());
            for definition in config.samples() {
                match store.resolve(definition.id()) {
                    Ok(sample) => {
                        let rate = sample.audio().sample_rate() as f64;
                        let region = sample.region();
                        println!(
                            "- {} ({}): {:.3}s, loop {:.3}s-{:.3}s, {} channel(s)",
                            definition.id(),
                            definition.label(),
                            sample.audio().duration().as_secs_f64(),
                            region.start as f64 / rate,
                            region.end as f64 / rate,
                            sample.audio().channel_count(),
                        );
                    }
                    Err(e) => println!(
                        "- {} ({}): unavailable: {}",
                        definition.id(),
                        definition.label(),
                        e
                    ),
                }
            }
        }
        Commands::Start { config_path } => {
            let config_path = config_path.map(PathBuf::from);
            let (config, base_path) = config::load(config_path.as_deref())?;
            let device = audio::get_device(config.audio())?;
            info!(device = %device, "Using audio device");

            let clock = Arc::new(SystemClock::new());
            let mut coordinator = Coordinator::new(&config, &base_path, device, clock.clone());

            let beats = config.rhythm().beats_per_cycle() as usize;
            let (ticks_tx, mut ticks_rx) = mpsc::channel(beats);
            coordinator.on_tick(tick_forwarder(ticks_tx));
            tokio::spawn(async move {
                while let Some(tick) = ticks_rx.recv().await {
                    info!(
                        beat = tick.beat_index + 1,
                        beats_per_cycle = tick.beats_per_cycle,
                        "Beat"
                    );
                }
            });

            let mut controller =
                Controller::new(coordinator, clock, Arc::new(keyboard::Driver::new()));
            controller.join().await?;
        }
    }

    Ok(())
}
