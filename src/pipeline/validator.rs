use crate::schemas::TermMapping;

/// Keep only the candidate terms that occur in the passage (case-insensitive substring).
/// Never invents entries; difficulties are carried over untouched.
pub fn validate_terms(candidates: TermMapping, passage: &str) -> TermMapping {
    let folded = passage.to_lowercase();
    candidates
        .into_iter()
        .filter(|(term, _)| folded.contains(&term.to_lowercase()))
        .collect()
}
