use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

// Non-greedy so adjacent regions stay separate; (?s) lets display math span lines
static MATH_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[MATH\](.*?)\[/MATH\]").expect("math marker pattern should compile")
});

/// Replace every `[MATH]expr[/MATH]` region with `$expr$`, leaving other text untouched.
pub fn format_latex_math(text: &str) -> String {
    match MATH_TAG.replace_all(text, |caps: &regex::Captures| format!("${}$", &caps[1])) {
        Cow::Borrowed(unchanged) => unchanged.to_string(),
        Cow::Owned(replaced) => replaced,
    }
}

/// True when the text still carries a complete marker pair
pub fn has_math_markers(text: &str) -> bool {
    MATH_TAG.is_match(text)
}
