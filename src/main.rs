mod cli;
mod ui;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

use cli::{Cli, Command};
use scribeflow::api::ApiClient;
use scribeflow::config::ScribeConfig;
use scribeflow::job::{self, BackgroundJob, ProcessedJobs};
use scribeflow::poller::JobPoller;
use scribeflow::transcription::{
    Outcome, TranscriptionOptions, TranscriptionOrchestrator, TranscriptionRequest,
    settle_correction_job, sink,
};
use scribeflow::validation::validate;
use ui::{Busy, ConsoleSink, PollProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ScribeConfig::load(cli.config.as_deref())?;
    debug!(server_url = %config.server_url, "configuration loaded");

    match cli.command {
        Command::Validate { text } => {
            ui::print_validation(&validate(Some(&text)));
        }
        Command::Extract { job } => {
            let job = read_job(&job)?;
            match job::extract(&job) {
                Some(text) => println!("{text}"),
                None => println!("(no text)"),
            }
        }
        Command::Classify { job } => {
            let job = read_job(&job)?;
            let classifier = config.poller().classifier;
            let result = classifier.classify(Some(&job), &mut ProcessedJobs::new());
            ui::print_job_result(&result);
        }
        Command::Transcribe {
            audio,
            language,
            session,
            project_dir,
            no_correct,
        } => {
            let bytes = tokio::fs::read(&audio)
                .await
                .with_context(|| format!("reading {}", audio.display()))?;
            let file_name = audio
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio.webm".to_string());
            let options = TranscriptionOptions {
                session_id: session.unwrap_or_else(new_session_id),
                language: language.or_else(|| config.language()),
                project_directory: project_dir,
                auto_correct: config.auto_correct && !no_correct,
            };
            info!(session_id = %options.session_id, bytes = bytes.len(), "transcribing");

            let orchestrator = TranscriptionOrchestrator::new(client(&config)?);
            let mut console = ConsoleSink::new(cli.verbose);
            let busy = Busy::start("Transcribing...");
            let outcome =
                sink::run_audio(&orchestrator, bytes, &file_name, &options, &mut console).await;
            busy.finish();

            let outcome = settle(&orchestrator, &config.poller(), &options, outcome, &mut console).await;
            ui::print_outcome(&outcome);
        }
        Command::Correct {
            text,
            language,
            session,
        } => {
            let options = TranscriptionOptions {
                session_id: session.unwrap_or_else(new_session_id),
                language: language.or_else(|| config.language()),
                project_directory: None,
                auto_correct: true,
            };
            let orchestrator = TranscriptionOrchestrator::new(client(&config)?);
            let mut console = ConsoleSink::new(cli.verbose);
            let busy = Busy::start("Correcting...");
            let request = TranscriptionRequest::raw(Some(text), options.clone());
            let outcome = sink::run(&orchestrator, &request, &mut console).await;
            busy.finish();

            let outcome = settle(&orchestrator, &config.poller(), &options, outcome, &mut console).await;
            ui::print_outcome(&outcome);
        }
        Command::Poll { job_id } => {
            let client = client(&config)?;
            let progress = PollProgress::start(&job_id);
            let result = config
                .poller()
                .poll(&client, &job_id, |r| progress.observe(r))
                .await;
            progress.finish();
            ui::print_job_result(&result?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "scribeflow=debug" } else { "scribeflow=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn client(config: &ScribeConfig) -> Result<ApiClient> {
    Ok(ApiClient::new(config.server_url.clone(), config.api_key())?)
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn read_job(path: &Path) -> Result<BackgroundJob> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let job = serde_json::from_str(&contents)
        .with_context(|| format!("parsing job record {}", path.display()))?;
    Ok(job)
}

/// Follow background jobs until the flow reaches a terminal outcome.
///
/// A job without raw text is a transcription job; one with raw text is
/// the correction of that text, and any polling failure falls back to it.
async fn settle(
    orchestrator: &TranscriptionOrchestrator<ApiClient>,
    poller: &JobPoller,
    options: &TranscriptionOptions,
    mut outcome: Outcome,
    console: &mut ConsoleSink,
) -> Outcome {
    while let Outcome::AwaitingJob { raw, job_id } = &outcome {
        let progress = PollProgress::start(job_id);
        let polled = poller
            .poll(orchestrator.client(), job_id, |r| progress.observe(r))
            .await;
        progress.finish();

        let next = match (raw, polled) {
            (None, Ok(result)) => {
                match orchestrator
                    .settle_transcription_job(job_id, &result, options)
                    .await
                {
                    Some(next) => next,
                    None => continue,
                }
            }
            (None, Err(e)) => Outcome::Failed {
                error: e.to_string(),
            },
            (Some(raw), Ok(result)) => match settle_correction_job(raw, &result) {
                Some(next) => next,
                None => continue,
            },
            (Some(raw), Err(e)) => Outcome::FellBack {
                text: raw.clone(),
                cause: e.to_string(),
            },
        };
        outcome = sink::apply(&next, console);
    }
    outcome
}
