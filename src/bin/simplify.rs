//! simplify - annotate a single passage and print the result
//!
//! Reads the passage from --text or stdin, runs it through the same pipeline as the
//! batch binary, and prints the annotation as JSON (or a short human summary).

use std::io::Read;

use anyhow::{Result, bail};
use clap::Parser;
use math_annotate::config::ProviderKind;
use math_annotate::{Annotator, AnnotatorOptions, Config, QuestionRecord, build_collaborators};

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate one passage and print the result", long_about = None)]
struct Args {
    /// Passage to annotate; read from stdin when omitted
    #[arg(long)]
    text: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Term extraction provider (openai|cli|glossary)
    #[arg(long)]
    extractor: Option<ProviderKind>,

    /// Simplification provider (openai|cli|glossary)
    #[arg(long)]
    simplifier: Option<ProviderKind>,

    /// Print a plain-text summary instead of JSON
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();
    math_annotate::init_tracing("math_annotate=warn");

    let passage = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if passage.trim().is_empty() {
        bail!("no passage given (use --text or pipe it on stdin)");
    }

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

    let (extractor, simplifier) = build_collaborators(&config)?;
    let annotator =
        Annotator::new(extractor, simplifier).with_options(AnnotatorOptions::from_config(&config));

    let record = QuestionRecord {
        body: passage,
        ..Default::default()
    };
    let (annotation, outcome) = annotator.annotate_record(&record).await;

    if args.plain {
        println!("Difficulty: {}", annotation.difficulty);
        if annotation.terms.is_empty() {
            println!("Terms: (none)");
        } else {
            println!("Terms:");
            for (term, level) in &annotation.terms {
                println!("  - {} ({})", term, level);
            }
        }
        println!("\n{}", annotation.simplified_passage);
        if outcome.extraction_failed || outcome.simplification_failed {
            eprintln!(
                "⚠️  fallback used (extraction failed: {}, simplification failed: {})",
                outcome.extraction_failed, outcome.simplification_failed
            );
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&annotation)?);
    }

    Ok(())
}
