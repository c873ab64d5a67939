//! Subfuse - streaming subtitle transcription and translation
//!
//! Entry point for the HTTP service and the local subtitle tools.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subfuse::cli::{Args, Commands};
use subfuse::config::Config;
use subfuse::error::SubfuseError;
use subfuse::progress::{ProgressEvent, ProgressStream, Stage, StageRange, TranscriptResult};
use subfuse::provider::{Credentials, ProviderFactory, models};
use subfuse::subtitle;
use subfuse::translate::{BatchOptions, BatchOrchestrator, LlmTranslatorFactory, TranslatorFactory};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            subfuse::server::serve(config).await?;
        }
        Commands::Models => {
            for provider in models::catalog() {
                println!("\n{} ({})", provider.name, provider.id);
                println!("  {:<48} {:<10}", "Transcription models", "");
                for model in &provider.transcription_models {
                    println!("    {:<46}", model.id);
                }
                println!("  {:<48} {:<10}", "Translation models", "Structured");
                for model in &provider.translation_models {
                    let structured = if model.supports_structured_output == Some(true) { "yes" } else { "no" };
                    println!("    {:<46} {:<10}", model.id, structured);
                }
            }
        }
        Commands::Translate { input, output, target_lang, provider, model, api_key, base_url } => {
            info!("Translating subtitles: {}", input.display());
            translate_file(&config, &input, &output, target_lang, &provider, model, api_key, base_url).await?;
        }
        Commands::Config { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Translate a local subtitle file through the batch orchestrator
#[allow(clippy::too_many_arguments)]
async fn translate_file(
    config: &Config,
    input: &Path,
    output: &Path,
    target_language: String,
    provider_name: &str,
    model: String,
    api_key: String,
    base_url: Option<String>,
) -> Result<()> {
    let provider = ProviderFactory::create(provider_name).ok_or_else(|| {
        SubfuseError::Validation(format!(
            "Invalid provider '{}'. Available: {}",
            provider_name,
            ProviderFactory::list().join(", ")
        ))
    })?;
    let options = BatchOptions::from(&config.translate).with_provider_limit(provider.concurrency_limit());
    let credentials = Credentials::new(api_key, base_url);
    let translator = LlmTranslatorFactory::new(config.remote.clone(), &config.translate)
        .create_translator(provider, &credentials, &model)?;
    let cues = subtitle::read_document(input).await?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")?.progress_chars("=> "),
    );

    let mut events = ProgressStream::spawn(move |sender| async move {
        let reporter = sender.reporter(Stage::Translating, StageRange::new(0, 100));
        let outcome = BatchOrchestrator::new(options)
            .translate(cues, &target_language, translator.as_ref(), Some(&reporter))
            .await;
        Ok(TranscriptResult {
            vtt: subtitle::encode(&outcome.cues),
            cached: false,
        })
    });

    let mut document = None;
    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Progress { percent, detail, .. } => {
                bar.set_position(percent as u64);
                bar.set_message(detail);
            }
            ProgressEvent::Result { vtt, .. } => document = Some(vtt),
            ProgressEvent::Error { message } => {
                bar.abandon_with_message(message.clone());
                return Err(SubfuseError::Translation(message).into());
            }
        }
    }
    bar.finish();

    let document = document.ok_or_else(|| SubfuseError::Aborted("translation produced no result".to_string()))?;
    subtitle::write_document(&subtitle::decode(&document), output).await?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subfuse").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "subfuse.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subfuse.log").display()
    );

    Ok(())
}
