use crate::schemas::{Difficulty, TermMapping};

/// Passage difficulty when no term survived validation
pub const EMPTY_PASSAGE_DIFFICULTY: Difficulty = Difficulty::Easy;

/// Reduce validated terms to one passage label.
///
/// Mean of ordinals (easy=1, medium=2, hard=3), rounded to nearest with ties to even
/// (1.5 -> 2, 2.5 -> 2), clamped into 1..=3. Computed on integers so ties are exact.
pub fn aggregate_difficulty(validated: &TermMapping) -> Difficulty {
    aggregate_levels(validated.values().copied())
}

/// Same as [`aggregate_difficulty`] over any multiset of labels
pub fn aggregate_levels(levels: impl IntoIterator<Item = Difficulty>) -> Difficulty {
    let (sum, count) = levels
        .into_iter()
        .fold((0u64, 0u64), |(s, n), d| (s + d.ordinal() as u64, n + 1));
    if count == 0 {
        return EMPTY_PASSAGE_DIFFICULTY;
    }
    Difficulty::from_ordinal(round_half_even(sum, count))
}

/// Round `num / den` to the nearest integer, ties to even. `den` must be non-zero.
fn round_half_even(num: u64, den: u64) -> u64 {
    let quotient = num / den;
    let twice_rem = 2 * (num % den);
    if twice_rem > den || (twice_rem == den && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Difficulty::{Easy, Hard, Medium};

    fn mapping(pairs: &[(&str, Difficulty)]) -> TermMapping {
        pairs.iter().map(|(t, d)| (t.to_string(), *d)).collect()
    }

    #[test]
    fn empty_is_easy() {
        assert_eq!(aggregate_difficulty(&TermMapping::new()), Easy);
    }

    #[test]
    fn single_term_is_its_own_level() {
        for d in Difficulty::ALL {
            assert_eq!(aggregate_difficulty(&mapping(&[("a", d)])), d);
        }
    }

    #[test]
    fn documented_boundaries() {
        assert_eq!(aggregate_difficulty(&mapping(&[("a", Easy), ("b", Hard)])), Medium);
        // mean 5/3 = 1.67 rounds to 2
        assert_eq!(
            aggregate_difficulty(&mapping(&[("a", Easy), ("b", Easy), ("c", Hard)])),
            Medium
        );
        // mean 4/3 = 1.33 rounds to 1
        assert_eq!(
            aggregate_difficulty(&mapping(&[("a", Easy), ("b", Easy), ("c", Medium)])),
            Easy
        );
    }

    #[test]
    fn ties_go_to_even() {
        // 1.5 -> 2
        assert_eq!(aggregate_difficulty(&mapping(&[("a", Easy), ("b", Medium)])), Medium);
        // 2.5 -> 2
        assert_eq!(aggregate_difficulty(&mapping(&[("a", Medium), ("b", Hard)])), Medium);
        assert_eq!(round_half_even(7, 2), 4);
        assert_eq!(round_half_even(5, 2), 2);
        assert_eq!(round_half_even(8, 3), 3);
    }

    #[test]
    fn order_and_identity_do_not_matter() {
        let a = mapping(&[("a", Hard), ("b", Easy)]);
        let b = mapping(&[("b", Easy), ("a", Hard)]);
        let renamed = mapping(&[("zeta", Hard), ("alpha", Easy)]);
        assert_eq!(aggregate_difficulty(&a), aggregate_difficulty(&b));
        assert_eq!(aggregate_difficulty(&a), aggregate_difficulty(&renamed));
        assert_eq!(aggregate_levels([Easy, Hard]), aggregate_levels([Hard, Easy]));
    }

    #[test]
    fn matches_float_mean_with_ties_even() {
        // Exhaustive over every multiset of up to six labels
        for e in 0..=6u64 {
            for m in 0..=(6 - e) {
                for h in 0..=(6 - e - m) {
                    let n = e + m + h;
                    if n == 0 {
                        continue;
                    }
                    let levels = std::iter::repeat_n(Easy, e as usize)
                        .chain(std::iter::repeat_n(Medium, m as usize))
                        .chain(std::iter::repeat_n(Hard, h as usize));
                    let mean = (e + 2 * m + 3 * h) as f64 / n as f64;
                    let expected = Difficulty::from_ordinal(mean.round_ties_even() as u64);
                    assert_eq!(aggregate_levels(levels), expected, "e={e} m={m} h={h}");
                }
            }
        }
    }
}
