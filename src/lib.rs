//! Annotates math forum questions with difficult terms, a simplified passage, and an
//! overall difficulty label.

pub mod clients;
pub mod collaborators;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod glossary;
pub mod pipeline;
pub mod prompts;
pub mod schemas;
pub mod store;

pub use collaborators::{TermExtractor, TextSimplifier, build_collaborators};
pub use config::Config;
pub use error::{AnnotatorError, Result};
pub use pipeline::{AnnotationStats, Annotator, AnnotatorOptions};
pub use schemas::{AnnotationRecord, Difficulty, QuestionRecord, TermMapping};
pub use store::{AnnotationSink, JsonlSink, OpenMode};

/// Install the fmt subscriber used by the binaries. An unparsable filter falls back to
/// `math_annotate=info`.
pub fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("math_annotate=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
