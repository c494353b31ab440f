/// The contraction ↔ expansion pairs used by query normalization (spec
/// §4.7 step 3). Each contracted form maps to its sibling contraction
/// plus its expanded phrase forms — e.g. `don't` ↔ `didn't`, `do not`,
/// `did not` — mirroring `contraction_pairs` in
/// `original_source/src/providers/google_chat/utils/search_manager.py`
/// exactly (same twelve entries, same per-entry variant lists).
pub const CONTRACTION_PAIRS: &[(&str, &[&str])] = &[
    ("don't", &["didn't", "do not", "did not"]),
    ("didn't", &["don't", "did not", "do not"]),
    ("isn't", &["wasn't", "is not", "was not"]),
    ("wasn't", &["isn't", "was not", "is not"]),
    ("can't", &["couldn't", "cannot", "could not"]),
    ("couldn't", &["can't", "could not", "cannot"]),
    ("won't", &["wouldn't", "will not", "would not"]),
    ("wouldn't", &["won't", "would not", "will not"]),
    ("aren't", &["weren't", "are not", "were not"]),
    ("weren't", &["aren't", "were not", "are not"]),
    ("haven't", &["hadn't", "have not", "had not"]),
    ("hadn't", &["haven't", "had not", "have not"]),
];

/// Every `(contraction, variants)` entry whose contracted form literally
/// occurs in `text` (case-insensitive), in table order. Unlike
/// `find_contraction`, this does not stop at the first match — a query
/// containing more than one contraction (e.g. "don't" and "isn't")
/// produces alternatives for each, mirroring the original's non-breaking
/// `for contraction, variants in contraction_pairs.items()` loop used by
/// exact-mode alternative generation.
pub fn contraction_matches(text: &str) -> Vec<&'static (&'static str, &'static [&'static str])> {
    let lower = text.to_ascii_lowercase();
    CONTRACTION_PAIRS.iter().filter(|(c, _)| lower.contains(c)).collect()
}

/// The first contraction entry whose contracted form occurs in `text`.
/// Used where only a single rewrite is wanted — regex mode mirrors the
/// original's `break`-after-first-match behavior (spec §4.7 regex mode).
pub fn find_contraction(text: &str) -> Option<&'static (&'static str, &'static [&'static str])> {
    let lower = text.to_ascii_lowercase();
    CONTRACTION_PAIRS.iter().find(|(c, _)| lower.contains(c))
}

/// The distinct multi-word expansion phrases across the whole table
/// (e.g. "do not", "is not") — the original's `expanded_to_contraction`
/// keys, used to detect the converse direction: an expansion phrase
/// present in text with no literal contraction alongside it.
pub fn expansion_phrases() -> Vec<&'static str> {
    let mut phrases: Vec<&'static str> = Vec::new();
    for (_, variants) in CONTRACTION_PAIRS {
        for v in *variants {
            if v.contains(' ') && !phrases.contains(v) {
                phrases.push(v);
            }
        }
    }
    phrases
}

/// Every contraction whose variant list contains `phrase` — the
/// converse lookup the original's merged `expanded_to_contraction` map
/// performs when `phrase` (e.g. "do not") is found in text and must be
/// mapped back to the contracted form(s) that expand to it.
pub fn contractions_for_phrase(phrase: &str) -> Vec<&'static str> {
    CONTRACTION_PAIRS
        .iter()
        .filter(|(_, variants)| variants.contains(&phrase))
        .map(|(c, _)| *c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_contraction_case_insensitively() {
        let (c, _) = find_contraction("I DON'T know").unwrap();
        assert_eq!(*c, "don't");
    }

    #[test]
    fn contraction_variants_include_sibling_contraction() {
        let (_, variants) = find_contraction("don't forget").unwrap();
        assert!(variants.contains(&"didn't"));
        assert!(variants.contains(&"do not"));
        assert!(variants.contains(&"did not"));
    }

    #[test]
    fn phrase_maps_back_to_both_sibling_contractions() {
        let contractions = contractions_for_phrase("do not");
        assert!(contractions.contains(&"don't"));
        assert!(contractions.contains(&"didn't"));
    }

    #[test]
    fn contraction_matches_returns_every_entry_present() {
        let matches = contraction_matches("don't know if isn't true");
        let keys: Vec<&str> = matches.iter().map(|(c, _)| *c).collect();
        assert!(keys.contains(&"don't"));
        assert!(keys.contains(&"isn't"));
    }

    #[test]
    fn no_match_returns_none_or_empty() {
        assert!(find_contraction("hello world").is_none());
        assert!(contraction_matches("hello world").is_empty());
    }
}
