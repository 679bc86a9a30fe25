//! Annotation pipeline: normalize -> extract -> validate -> simplify + grade -> persist

pub mod difficulty;
pub mod normalize;
pub mod orchestrator;
pub mod validator;

pub use difficulty::aggregate_difficulty;
pub use normalize::format_latex_math;
pub use orchestrator::{AnnotationStats, Annotator, AnnotatorOptions, RecordOutcome};
pub use validator::validate_terms;
