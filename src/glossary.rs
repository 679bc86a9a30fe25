//! Offline term extraction and simplification from a built-in graded vocabulary.
//! Deterministic and model-free: useful for dry runs, CI, and as a baseline to compare
//! model output against.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::collaborators::{TermExtractor, TextSimplifier};
use crate::error::Result;
use crate::schemas::Difficulty::{Easy, Hard, Medium};
use crate::schemas::{Difficulty, TermMapping};

/// One vocabulary entry: canonical term, difficulty, short plain-language gloss
#[derive(Debug, Clone, Copy)]
pub struct GlossaryEntry {
    pub term: &'static str,
    pub difficulty: Difficulty,
    pub gloss: &'static str,
}

const fn entry(term: &'static str, difficulty: Difficulty, gloss: &'static str) -> GlossaryEntry {
    GlossaryEntry {
        term,
        difficulty,
        gloss,
    }
}

pub const VOCABULARY: &[GlossaryEntry] = &[
    entry("sum", Easy, "the result of adding numbers"),
    entry("product", Easy, "the result of multiplying numbers"),
    entry("fraction", Easy, "a part of a whole written as a/b"),
    entry("integer", Easy, "a whole number, possibly negative"),
    entry("prime number", Easy, "a whole number above 1 divisible only by 1 and itself"),
    entry("equation", Easy, "a statement that two expressions are equal"),
    entry("variable", Easy, "a letter standing for an unknown value"),
    entry("average", Easy, "the total divided by how many values there are"),
    entry("perimeter", Easy, "the distance around a shape"),
    entry("ratio", Easy, "a comparison of two quantities by division"),
    entry("polynomial", Medium, "a sum of terms like a*x^n with whole-number powers"),
    entry("logarithm", Medium, "the power a base must be raised to in order to get a number"),
    entry("exponent", Medium, "the power a number is raised to"),
    entry("limit", Medium, "the value an expression gets closer and closer to"),
    entry("derivative", Medium, "the rate at which a quantity changes"),
    entry("integral", Medium, "the accumulated total, such as the area under a curve"),
    entry("matrix", Medium, "a rectangular table of numbers"),
    entry("vector", Medium, "a quantity with both size and direction"),
    entry("determinant", Medium, "a single number computed from a square matrix"),
    entry("sequence", Medium, "an ordered list of numbers"),
    entry("series", Medium, "the sum of the terms of a sequence"),
    entry("probability", Medium, "how likely an event is, between 0 and 1"),
    entry("quadratic", Medium, "involving a square as the highest power"),
    entry("inequality", Medium, "a statement that one quantity is larger or smaller than another"),
    entry("permutation", Medium, "an arrangement of items in a particular order"),
    entry("modular arithmetic", Medium, "arithmetic where numbers wrap around after a fixed value"),
    entry("asymptote", Medium, "a line a curve approaches but never reaches"),
    entry("slope", Medium, "how steep a line is"),
    entry("gradient", Medium, "the direction and rate of fastest increase"),
    entry("bijection", Medium, "a one-to-one pairing between two sets"),
    entry("injective", Medium, "never sending two different inputs to the same output"),
    entry("surjective", Medium, "reaching every possible output"),
    entry("eigenvalue", Hard, "a number by which a matrix stretches one of its special directions"),
    entry("eigenvector", Hard, "a direction that a matrix only stretches, never turns"),
    entry("partial derivative", Hard, "the rate of change with respect to one variable, holding the others fixed"),
    entry("differential equation", Hard, "an equation relating a function to its rates of change"),
    entry("Taylor series", Hard, "an infinite sum of polynomial terms approximating a function"),
    entry("Fourier transform", Hard, "a way of writing a function as a mix of waves"),
    entry("uniform convergence", Hard, "convergence at the same speed everywhere at once"),
    entry("convergence", Hard, "settling down to a fixed value"),
    entry("Cauchy sequence", Hard, "a sequence whose terms get arbitrarily close to each other"),
    entry("supremum", Hard, "the smallest value that is at least every element of a set"),
    entry("infimum", Hard, "the largest value that is at most every element of a set"),
    entry("homomorphism", Hard, "a map between structures that respects their operations"),
    entry("isomorphism", Hard, "a structure-preserving map that can be reversed"),
    entry("manifold", Hard, "a space that looks flat when you zoom in close enough"),
    entry("topology", Hard, "the study of properties kept under continuous deformation"),
    entry("Lebesgue measure", Hard, "the standard notion of length, area or volume for general sets"),
    entry("Hilbert space", Hard, "an infinite-dimensional space with lengths and angles"),
    entry("Jacobian", Hard, "the matrix of all first-order partial derivatives"),
    entry("cardinality", Hard, "the number of elements in a set"),
];

struct CompiledEntry {
    entry: GlossaryEntry,
    pattern: Regex,
}

static COMPILED: Lazy<Vec<CompiledEntry>> = Lazy::new(|| {
    VOCABULARY
        .iter()
        .filter_map(|e| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(e.term)))
                .ok()
                .map(|pattern| CompiledEntry { entry: *e, pattern })
        })
        .collect()
});

static INLINE_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[^$]*\$").expect("inline math pattern should compile"));

/// Look up a vocabulary entry by term, ignoring case
pub fn lookup(term: &str) -> Option<&'static GlossaryEntry> {
    VOCABULARY.iter().find(|e| e.term.eq_ignore_ascii_case(term))
}

fn math_spans(passage: &str) -> Vec<(usize, usize)> {
    INLINE_MATH
        .find_iter(passage)
        .map(|m| (m.start(), m.end()))
        .collect()
}

fn inside(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|&(s, e)| start < e && end > s)
}

/// First whole-word, case-insensitive occurrence outside inline math
fn first_occurrence(pattern: &Regex, passage: &str, math: &[(usize, usize)]) -> Option<(usize, usize)> {
    pattern
        .find_iter(passage)
        .map(|m| (m.start(), m.end()))
        .find(|&(s, e)| !inside(math, s, e))
}

#[derive(Debug, Clone)]
struct Hit {
    start: usize,
    end: usize,
    text: String,
    difficulty: Difficulty,
}

/// Finds vocabulary terms in the passage
pub struct GlossaryExtractor {
    max_terms: usize,
}

impl GlossaryExtractor {
    pub fn new(max_terms: usize) -> Self {
        Self {
            max_terms: max_terms.max(1),
        }
    }

    /// Longest match wins, hardest first, then earliest, capped at `max_terms`.
    /// Keys keep the casing used in the passage.
    pub fn find_terms(&self, passage: &str) -> TermMapping {
        let math = math_spans(passage);
        let mut hits: Vec<Hit> = COMPILED
            .iter()
            .filter_map(|c| {
                first_occurrence(&c.pattern, passage, &math).map(|(start, end)| Hit {
                    start,
                    end,
                    text: passage[start..end].to_string(),
                    difficulty: c.entry.difficulty,
                })
            })
            .collect();

        // Drop hits nested inside a longer hit ("derivative" in "partial derivative")
        let all = hits.clone();
        hits.retain(|h| {
            !all.iter().any(|o| {
                (o.end - o.start) > (h.end - h.start) && o.start <= h.start && h.end <= o.end
            })
        });

        hits.sort_by(|a, b| b.difficulty.cmp(&a.difficulty).then(a.start.cmp(&b.start)));
        hits.into_iter()
            .take(self.max_terms)
            .map(|h| (h.text, h.difficulty))
            .collect()
    }
}

#[async_trait]
impl TermExtractor for GlossaryExtractor {
    async fn extract(&self, passage: &str) -> Result<TermMapping> {
        Ok(self.find_terms(passage))
    }
}

/// Inserts a short gloss after the first occurrence of every medium or hard term
#[derive(Default)]
pub struct GlossarySimplifier;

impl GlossarySimplifier {
    pub fn new() -> Self {
        GlossarySimplifier
    }

    pub fn annotate(&self, passage: &str, terms: &TermMapping) -> String {
        let math = math_spans(passage);
        let mut insertions: Vec<(usize, String)> = Vec::new();

        for (term, level) in terms {
            if *level < Difficulty::Medium {
                continue;
            }
            let Some(entry) = lookup(term) else { continue };
            let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))) else {
                continue;
            };
            if let Some((_, end)) = first_occurrence(&pattern, passage, &math)
                && !insertions.iter().any(|(at, _)| *at == end)
            {
                insertions.push((end, format!(" ({})", entry.gloss)));
            }
        }

        // Insert back to front so earlier offsets stay valid
        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out = passage.to_string();
        for (at, gloss) in insertions {
            out.insert_str(at, &gloss);
        }
        out
    }
}

#[async_trait]
impl TextSimplifier for GlossarySimplifier {
    async fn simplify(&self, passage: &str, terms: &TermMapping) -> Result<String> {
        Ok(self.annotate(passage, terms))
    }
}
