//! AAT Trainer - command line entry point
//!
//! Runs intake, sessions and status queries against a study directory. There
//! is no joystick driver in this crate, so intake and sessions are driven by
//! the simulated participant (pilot runs, data pipeline checks).

use aat_trainer::core::config::ExperimentConfig;
use aat_trainer::core::error::{AatError, Result};
use aat_trainer::core::types::{ParticipantId, Sex};
use aat_trainer::experiment::{Study, StudyPaths};
use aat_trainer::frontend::SimulatedFrontend;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::process::ExitCode;

/// Approach-avoidance training sessions
#[derive(Parser, Debug)]
#[command(name = "aat-trainer")]
#[command(about = "Multi-session approach-avoidance training")]
struct Args {
    /// Shared settings document
    #[arg(long, global = true, default_value = "data/settings.json")]
    settings: PathBuf,

    /// Directory holding one folder per participant
    #[arg(long, global = true, default_value = "data/participants")]
    config_dir: PathBuf,

    /// Directory the trial logs are written to
    #[arg(long, global = true, default_value = "data/output")]
    output_dir: PathBuf,

    /// Language file with every text shown to participants
    #[arg(long, global = true, default_value = "data/language/en.toml")]
    language: PathBuf,

    /// Root of the stimulus sets (set_a, set_b, standard, personalization)
    #[arg(long, global = true, default_value = "data/stimuli")]
    stimuli: PathBuf,

    /// File name prefix of participant documents
    #[arg(long, global = true, default_value = "aat")]
    prefix: String,

    /// Random seed for deterministic runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a participant record with ratings and personal images
    Intake {
        /// Six-digit participant ID
        #[arg(long)]
        id: ParticipantId,

        /// male, female, other or prefer-not-to-say
        #[arg(long)]
        sex: Sex,

        /// Replace an existing record
        #[arg(long)]
        overwrite: bool,
    },

    /// Run the participant's next session
    Session {
        #[arg(long)]
        id: ParticipantId,

        /// Share of simulated trials that start in the wrong direction
        #[arg(long, default_value_t = 0.1)]
        error_rate: f64,
    },

    /// Show where a participant is in the study
    Status {
        #[arg(long)]
        id: ParticipantId,
    },
}

fn run(args: Args) -> Result<()> {
    let config = ExperimentConfig::default();
    let paths = StudyPaths {
        settings: args.settings,
        config_dir: args.config_dir,
        output_dir: args.output_dir,
        language: args.language,
        stimuli: args.stimuli,
        prefix: args.prefix,
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::debug!("Seed {}", seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fps = config.frames_per_second as f64;

    match args.command {
        Command::Intake { id, sex, overwrite } => {
            let study = Study::open(&paths, config)?;
            let mut frontend = SimulatedFrontend::new(fps, seed);
            let record = study.intake(id, sex, overwrite, &mut frontend, &mut rng)?;
            println!(
                "Created {:?}",
                study.records().presession_path(&record.id)
            );
        }
        Command::Session { id, error_rate } => {
            let study = Study::open(&paths, config)?;
            let mut frontend = SimulatedFrontend::new(fps, seed).with_error_rate(error_rate);
            let report = study.run_session(&id, &mut frontend, &mut rng)?;
            println!(
                "Session {} of participant {} done (condition {}): {}/{} trials correct",
                report.session, report.id, report.condition, report.correct, report.trials
            );
            println!("Trial log: {:?}", report.log_path);
        }
        Command::Status { id } => {
            let study = Study::open(&paths, config)?;
            println!("{}", study.status(&id)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aat_trainer=info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AatError::Aborted) => {
            tracing::warn!("Session aborted; progress was not recorded");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
