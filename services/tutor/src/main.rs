//! Terminal front end for the math tutor.
//!
//! Reads one question per line from stdin, prints the tutor's reply and
//! speaks it through the default output device unless `--mute` is given.

mod audio;
mod config;
mod playback;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Command, Config};
use mathtutor_core::{
    session::{LocalSessionRegistry, Session},
    speech::SpeechSynthesizer,
    tutor::{Tutor, deliver},
};
use playback::LocalSpeaker;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const AUDIO_CHECK_MESSAGE: &str = "Hello, this is a test message from Math Tutor.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli).context("Failed to load configuration")?;

    // Replies go to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let speaker = config.tutor.voice_client().map(LocalSpeaker::new);

    if cli.command == Some(Command::CheckAudio) {
        let speaker = speaker.context("ELEVEN_LABS_API_KEY must be set to check audio")?;
        info!("Testing audio output...");
        speaker
            .speak(AUDIO_CHECK_MESSAGE)
            .await
            .context("Audio output test failed")?;
        info!("Audio output test passed");
        return Ok(());
    }

    let speaker = if config.mute {
        None
    } else {
        if speaker.is_none() {
            warn!("ELEVEN_LABS_API_KEY not set; replies will only be printed.");
        }
        speaker
    };

    let tutor = config
        .tutor
        .build_tutor()
        .context("Failed to build the tutor")?;
    run(&tutor, speaker.as_ref()).await
}

/// Runs one session until the student quits or stdin closes.
async fn run(tutor: &Tutor, speaker: Option<&LocalSpeaker>) -> anyhow::Result<()> {
    let mut session = Session::start(&LocalSessionRegistry)
        .await
        .context("Failed to start a session")?;
    info!(conversation_id = %session.conversation_id(), "Math Tutor is ready");
    println!("Math Tutor is ready! Ask your math questions...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match tutor.take_turn(&mut session, &line).await {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Turn rejected");
                let message = e.user_message();
                println!("Tutor: {message}");
                if let Some(speaker) = speaker {
                    deliver(&message, speaker).await;
                }
                continue;
            }
        };

        println!("Tutor: {}", command.text());
        if let Some(speaker) = speaker {
            deliver(command.text(), speaker).await;
        }
        if command.ends_session() {
            return Ok(());
        }
    }

    info!("Input closed; ending session");
    Ok(())
}
