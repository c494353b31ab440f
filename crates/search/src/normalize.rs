//! Query/text normalization shared by every search mode (spec §4.7,
//! "Query normalization"): Unicode NFKD decomposition, smart-quote
//! folding, and contraction-alternative generation.

use unicode_normalization::UnicodeNormalization;

use chatgate_domain::contractions;

/// NFKD-decomposes `s` and folds the two smart-quote apostrophes
/// (`'` U+2018, `'` U+2019) to the ASCII apostrophe. Applied to both
/// queries and message texts before any mode-specific matching so the
/// two sides of a comparison are on equal footing (spec §8 "Unicode
/// idempotence": normalizing an already-normalized string is a no-op).
pub fn normalize_unicode(s: &str) -> String {
    let decomposed: String = s.nfkd().collect();
    decomposed.replace('\u{2019}', "'").replace('\u{2018}', "'")
}

/// Builds the set of alternative query forms used by exact/regex mode
/// (spec §4.7 step 3): the primary (lowercased, normalized) query plus
/// one alternative per contraction substitution, in both directions —
/// contraction → expansion/sibling-contraction, and expansion phrase →
/// contraction (the "converse"). Every matching entry contributes, not
/// just the first, mirroring the original's non-breaking loop over its
/// merged contraction table. The primary form is always first; callers
/// use this to apply the 0.9× alternative-match penalty only to
/// non-primary entries.
pub fn query_alternatives(normalized_query_lower: &str) -> Vec<String> {
    let mut alternatives = vec![normalized_query_lower.to_string()];

    for (contraction, variants) in contractions::contraction_matches(normalized_query_lower) {
        for variant in *variants {
            let candidate = normalized_query_lower.replace(contraction, variant);
            if candidate != normalized_query_lower && !alternatives.contains(&candidate) {
                alternatives.push(candidate);
            }
        }
    }

    for phrase in contractions::expansion_phrases() {
        if normalized_query_lower.contains(phrase) {
            for contraction in contractions::contractions_for_phrase(phrase) {
                let candidate = normalized_query_lower.replace(phrase, contraction);
                if candidate != normalized_query_lower && !alternatives.contains(&candidate) {
                    alternatives.push(candidate);
                }
            }
        }
    }

    alternatives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_quotes_fold_to_ascii_apostrophe() {
        assert_eq!(normalize_unicode("don\u{2019}t"), "don't");
        assert_eq!(normalize_unicode("don\u{2018}t"), "don't");
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let once = normalize_unicode("café don\u{2019}t");
        let twice = normalize_unicode(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn contraction_substitution_produces_expansion_alternative() {
        let alts = query_alternatives("don't open");
        assert_eq!(alts[0], "don't open");
        assert!(alts.contains(&"do not open".to_string()));
    }

    #[test]
    fn converse_expansion_produces_contraction_alternative() {
        let alts = query_alternatives("do not open");
        assert_eq!(alts[0], "do not open");
        assert!(alts.contains(&"don't open".to_string()));
    }

    #[test]
    fn query_without_contraction_has_only_primary_form() {
        let alts = query_alternatives("unrelated text");
        assert_eq!(alts, vec!["unrelated text".to_string()]);
    }

    #[test]
    fn sibling_contraction_is_a_generated_alternative() {
        // spec.md's worked example: "don't" <-> "do not", "didn't".
        let alts = query_alternatives("don't forget");
        assert!(alts.contains(&"didn't forget".to_string()));
        assert!(alts.contains(&"do not forget".to_string()));
    }

    #[test]
    fn sibling_contraction_converse_also_resolves() {
        let alts = query_alternatives("didn't forget");
        assert!(alts.contains(&"don't forget".to_string()));
        assert!(alts.contains(&"did not forget".to_string()));
    }
}
