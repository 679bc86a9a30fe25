//! math-annotate - batch annotation of math forum questions
//!
//! Reads question records from a JSONL file, runs each through term extraction,
//! validation, simplification, and difficulty grading, and appends one annotated
//! record per line to the output file as soon as it is ready.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use clap::error::ErrorKind;
use math_annotate::config::{ProviderKind, RuntimeConfig};
use math_annotate::{
    AnnotationStats, Annotator, AnnotatorError, AnnotatorOptions, Config, JsonlSink, OpenMode,
    build_collaborators, prompts, store,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate math questions with difficult terms and simplified text", long_about = None)]
struct Args {
    /// Input JSONL file of question records
    input: PathBuf,

    /// Output JSONL file; appended to unless --overwrite is given
    output: PathBuf,

    /// TOML configuration file (default: $ANNOTATE_CONFIG or math_annotate.toml)
    #[arg(long)]
    config: Option<String>,

    /// Term extraction provider (openai|cli|glossary)
    #[arg(long)]
    extractor: Option<ProviderKind>,

    /// Simplification provider (openai|cli|glossary)
    #[arg(long)]
    simplifier: Option<ProviderKind>,

    /// Truncate the output file instead of appending
    #[arg(long)]
    overwrite: bool,

    /// Only process the first N records
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if !args.input.is_file() {
        eprintln!("File not found: {}", args.input.display());
        return ExitCode::FAILURE;
    }

    let _ = dotenvy::dotenv();
    math_annotate::init_tracing(&RuntimeConfig::load_from_env().log_level);

    match run(args).await {
        Ok(stats) => {
            if stats.cancelled {
                warn!("Run interrupted; output holds the records listed above");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(AnnotatorError::SinkWrite {
                index, persisted, ..
            }) = e.downcast_ref::<AnnotatorError>()
            {
                eprintln!(
                    "❌ Output write failed at record index {}; indices 0..{} were persisted",
                    index, persisted
                );
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<AnnotationStats> {
    let started_at = Utc::now();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(provider) = args.extractor {
        config.extraction.provider = provider;
    }
    if let Some(provider) = args.simplifier {
        config.simplification.provider = provider;
    }
    info!("Configuration loaded (prompts: {})", prompts::prompt_versions());

    let (extractor, simplifier) = build_collaborators(&config)?;
    let annotator =
        Annotator::new(extractor, simplifier).with_options(AnnotatorOptions::from_config(&config));

    let mut records = store::load_questions(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    info!("Loaded {} record(s) from {}", records.len(), args.input.display());

    let mode = if args.overwrite {
        OpenMode::Truncate
    } else {
        OpenMode::Append
    };
    let mut sink = JsonlSink::open(&args.output, mode)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current record");
            on_signal.cancel();
        }
    });

    let stats = annotator.annotate(&records, &mut sink, &cancel).await?;
    let elapsed = Utc::now() - started_at;

    println!("\n{}", "=".repeat(60));
    println!("📊 ANNOTATION COMPLETE ({})", started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Records loaded:          {}", stats.total);
    println!("  Records written:         {}", stats.persisted);
    println!("  Extraction failures:     {}", stats.extraction_failures);
    println!("  Simplification failures: {}", stats.simplification_failures);
    println!("  Terms proposed:          {}", stats.terms_proposed);
    println!("  Terms rejected:          {}", stats.terms_rejected);
    println!(
        "  Difficulty (e/m/h):      {}/{}/{}",
        stats.easy, stats.medium, stats.hard
    );
    println!("  Prompt versions:         {}", prompts::prompt_versions());
    println!("  Output:                  {}", sink.path().display());
    println!("  Elapsed:                 {}s", elapsed.num_seconds());
    println!("{}", "=".repeat(60));

    Ok(stats)
}
