//! Prompt text for the model-backed collaborators.
//!
//! Bump the version constants whenever the wording changes; the batch summary prints
//! them so a run's output can be matched to its prompts.

use crate::schemas::TermMapping;

pub const EXTRACTION_PROMPT_VERSION: &str = "v1";
pub const SIMPLIFICATION_PROMPT_VERSION: &str = "v1";

/// `extraction=v1 simplification=v1`, as printed in the run summary
pub fn prompt_versions() -> String {
    format!(
        "extraction={} simplification={}",
        EXTRACTION_PROMPT_VERSION, SIMPLIFICATION_PROMPT_VERSION
    )
}

/// Reply the extraction model may give instead of `{}`
pub const NO_TERMS_SENTINEL: &str = "No difficult terms found";

pub fn extraction_system_message(max_terms: usize) -> String {
    format!(
        "Your task is to list up to {max_terms} of the most difficult definitions, concepts, or \
         equations in the passage given in the user prompt. \
         Reply with a JSON object mapping each term to its difficulty, for example: \
         {{\"term1\": \"easy\", \"term2\": \"hard\"}}. \
         Difficulties must be one of \"easy\", \"medium\" or \"hard\". \
         Copy every term exactly as it is written in the passage. \
         If there are no difficult terms, reply with an empty JSON object: {{}}. \
         Do not add any explanation such as 'Here is:' or 'The identified terms are:'."
    )
}

pub fn extraction_user_prompt(passage: &str) -> String {
    format!(
        "PASSAGE: {passage}\n\nIdentify the most difficult terms in the passage and return a \
         JSON object with the terms and their difficulties. The difficulties can be \"easy\", \
         \"medium\", or \"hard\". If no difficult terms are found, return an empty JSON object: {{}}"
    )
}

pub fn simplification_system_message() -> String {
    "You rewrite mathematics questions so that a beginner can follow them. \
     Keep every piece of information in the passage, including all formulas written between \
     $ signs, which must be copied unchanged. \
     For each listed term, either explain it briefly in plain words where it first appears \
     or replace it with a simpler equivalent. \
     Do not answer the question, do not solve any equation, and do not add hints. \
     Reply with the rewritten passage only."
        .to_string()
}

pub fn simplification_user_prompt(passage: &str, terms: &TermMapping) -> String {
    let term_lines = if terms.is_empty() {
        "(none; only simplify the wording)".to_string()
    } else {
        terms
            .iter()
            .map(|(term, level)| format!("- {} ({})", term, level))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("TERMS TO EXPLAIN:\n{term_lines}\n\nPASSAGE:\n{passage}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Difficulty;

    #[test]
    fn versions_line_names_both_prompts() {
        let line = prompt_versions();
        assert!(line.contains(&format!("extraction={}", EXTRACTION_PROMPT_VERSION)));
        assert!(line.contains(&format!("simplification={}", SIMPLIFICATION_PROMPT_VERSION)));
    }

    #[test]
    fn extraction_prompt_carries_cap_and_passage() {
        assert!(extraction_system_message(5).contains("up to 5"));
        assert!(extraction_user_prompt("Solve $x^2$").contains("PASSAGE: Solve $x^2$"));
    }

    #[test]
    fn simplification_prompt_lists_terms() {
        let mut terms = TermMapping::new();
        terms.insert("derivative".into(), Difficulty::Hard);
        let prompt = simplification_user_prompt("Use the derivative.", &terms);
        assert!(prompt.contains("- derivative (hard)"));
        assert!(prompt.ends_with("Use the derivative."));

        let bare = simplification_user_prompt("p", &TermMapping::new());
        assert!(bare.contains("(none;"));
    }
}
