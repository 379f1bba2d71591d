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
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;

use museq::audio;
use museq::config::Session;
use museq::feedback::{CannedFeedback, FeedbackRequest, FeedbackService};
use museq::studio::Studio;
use museq::transport::TransportState;
use museq::util::{duration_minutes_seconds, pitch_name};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A step sequencer with a lookahead audio scheduler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the session's composition on a loop.
    Play {
        /// The path to the session config. Uses the built-in instruments if omitted.
        #[arg[short, long]]
        config: Option<PathBuf>,
        /// Stop after this many seconds. Plays until interrupted if omitted.
        #[arg[short, long]]
        seconds: Option<u64>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the composition the way it is sent for feedback.
    Describe {
        /// The path to the session config.
        #[arg[short, long]]
        config: Option<PathBuf>,
        /// Print the request as JSON instead of text.
        #[arg[short, long]]
        json: bool,
    },
    /// Asks the bundled feedback service about the composition.
    Feedback {
        /// The path to the session config.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
    /// Validates a session config without opening audio.
    Check {
        /// The path to the session config.
        #[arg[short, long]]
        config: Option<PathBuf>,
    },
}

fn load_session(path: Option<&PathBuf>) -> Result<Session, Box<dyn Error>> {
    match path {
        Some(path) => Ok(Session::deserialize(path)?),
        None => Ok(Session::default()),
    }
}

fn feedback_request(session: &Session) -> Result<FeedbackRequest, Box<dyn Error>> {
    let composition = session.composition()?;
    Ok(FeedbackRequest::from_tracks(
        &composition.snapshot(),
        session.bpm()?,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config, seconds } => {
            let session = load_session(config.as_ref())?;
            let studio = Studio::from_session(&session)?;

            let report = studio.load_samples().await;
            for failure in &report.failed {
                println!("Sample unavailable, track will be silent: {}", failure);
            }

            studio.set_transport(TransportState::Running)?;
            let mut playhead = studio.subscribe_playhead();
            let stop = async {
                match seconds {
                    Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                    None => {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            info!(err = %e, "Unable to listen for interrupt");
                        }
                    }
                }
            };
            tokio::pin!(stop);

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    changed = playhead.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let subdivision = *playhead.borrow_and_update();
                        if subdivision % 4 == 0 {
                            info!(beat = subdivision / 4 + 1, "Playhead");
                        }
                    }
                }
            }

            studio.set_transport(TransportState::Stopped)?;
        }
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
        Commands::Describe { config, json } => {
            let session = load_session(config.as_ref())?;
            let request = feedback_request(&session)?;
            if json {
                println!("{}", request.to_json()?);
            } else {
                print!("{}", request.describe());
            }
        }
        Commands::Feedback { config } => {
            let session = load_session(config.as_ref())?;
            let request = feedback_request(&session)?;
            println!("{}", CannedFeedback.feedback(&request).await?);
        }
        Commands::Check { config } => {
            let session = load_session(config.as_ref())?;
            session.validate()?;

            let bpm = session.bpm()?;
            let transport = session.transport()?;
            let loop_length = Duration::from_secs_f64(
                transport.seconds_per_subdivision(bpm) * transport.total_subdivisions() as f64,
            );
            let composition = session.composition()?;
            println!(
                "Session OK: {} tracks at {} BPM, loop of {} ({} subdivisions)",
                composition.snapshot().len(),
                bpm,
                duration_minutes_seconds(loop_length),
                transport.total_subdivisions()
            );
            for track in composition.snapshot().iter() {
                println!(
                    "- {} [{}] {} ({} notes)",
                    track.name(),
                    track.instrument().kind(),
                    track.instrument().sample(),
                    track.len()
                );
                for note in track.notes() {
                    println!("    {} at {}", pitch_name(note.pitch()), note.time());
                }
            }
        }
    }

    Ok(())
}
