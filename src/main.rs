mod cli;
mod config;
mod domain;
mod error;
mod infra;
mod media;
mod workflows;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;
use infra::opensubtitles::Session;
use media::encoding::EncodingNormalizer;
use workflows::correlator;
use workflows::episode::EpisodeKeyExtractor;
use workflows::orchestrator::Orchestrator;
use workflows::selection;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.inputs.is_empty() {
        bail!("Usage: subtitler [video|directory]...");
    }

    let config = Config::load(&cli)?;
    let normalizer = EncodingNormalizer::from_labels(&config.encoding.candidates)?;
    let extractor = EpisodeKeyExtractor::new();

    let mut table = correlator::correlate(&cli.inputs, &extractor, config.correlation_policy());
    if table.is_empty() {
        bail!("No video files found");
    }
    info!(videos = table.len(), "Found video file(s) to process");
    for pairing in table.iter() {
        debug!(
            video = %pairing.video.display(),
            subtitles = pairing.subtitles.len(),
            "paired video"
        );
    }

    let session = Session::new(&config.service_settings())
        .context("Failed to set up the subtitle service client")?;
    let selector = selection::from_config(config.choose_subtitle);

    let mut orchestrator = Orchestrator::new(&session, selector, normalizer, config.languages.clone());
    let summary = orchestrator.run(&mut table);

    info!(
        renamed = summary.renamed,
        downloaded = summary.downloaded,
        not_found = summary.not_found,
        failed = summary.failed,
        "Done!"
    );
    Ok(())
}
