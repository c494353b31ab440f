//! Multi-strategy message ranking (spec §4.7, C8): exact, regex,
//! semantic, and hybrid modes over an in-memory message slice, plus the
//! mode-resolution and fallback rules that make every mode total (never
//! an error response) except for genuinely invalid arguments.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::RegexBuilder;

use chatgate_domain::config::SearchConfigDocument;
use chatgate_domain::search::{sort_scored_stable, ScoredMessage, SearchMode};
use chatgate_domain::Message;

use chatgate_embed::{EmbeddingProvider, SimilarityMetric};

use crate::normalize::{normalize_unicode, query_alternatives};

/// Multi-mode ranking engine. Holds the search-mode configuration and an
/// optional embedding provider — semantic mode degrades to exact mode
/// when the provider is absent or unavailable (spec §4.7 mode
/// resolution), so the engine never refuses to run a search.
pub struct SearchEngine {
    config: SearchConfigDocument,
    embedder: Option<Arc<EmbeddingProvider>>,
}

impl SearchEngine {
    pub fn new(config: SearchConfigDocument, embedder: Option<Arc<EmbeddingProvider>>) -> Self {
        Self { config, embedder }
    }

    /// Mode resolution (spec §4.7): unset → `default_mode`; unknown or
    /// disabled → `exact`; `semantic` with no available embedder →
    /// `exact`. Hybrid is never gated on an `enabled` flag of its own —
    /// it composes whichever of exact/regex/semantic are enabled.
    ///
    /// `Unset` and `Unknown` are resolved differently on purpose: an
    /// unset mode looks up `default_mode` (which may itself be any real
    /// mode), while an unknown mode string always lands on `exact`
    /// regardless of what `default_mode` is configured to — otherwise an
    /// unrecognized mode string would silently inherit `default_mode`
    /// instead of the spec-mandated `exact` fallback.
    pub fn resolve_mode(&self, requested: SearchMode) -> SearchMode {
        let candidate = match requested {
            SearchMode::Unset => SearchMode::parse(Some(&self.config.search.default_mode)),
            other => other,
        };

        let candidate = match candidate {
            SearchMode::Hybrid => SearchMode::Hybrid,
            SearchMode::Exact | SearchMode::Regex | SearchMode::Semantic => {
                if self.config.is_mode_enabled(candidate.as_str()) {
                    candidate
                } else {
                    SearchMode::Exact
                }
            }
            SearchMode::Unset | SearchMode::Unknown => SearchMode::Exact,
        };

        if candidate == SearchMode::Semantic && !self.semantic_available() {
            SearchMode::Exact
        } else {
            candidate
        }
    }

    fn semantic_available(&self) -> bool {
        self.embedder.as_ref().is_some_and(|e| e.available())
    }

    fn weight(&self, mode: &str, default: f64) -> f64 {
        self.config.mode(mode).map(|m| m.weight).unwrap_or(default)
    }

    /// Entry point: resolves `mode`, dispatches, and returns a list
    /// sorted strictly by score descending (spec §4.7 "Contract of
    /// results"). `max_results` truncation is the caller's job — this
    /// engine ranks, it does not paginate.
    pub fn search(&self, query: &str, messages: &[Message], mode: SearchMode) -> Vec<ScoredMessage> {
        match self.resolve_mode(mode) {
            SearchMode::Exact => self.exact_search(query, messages),
            SearchMode::Regex => self.regex_search(query, messages),
            SearchMode::Semantic => self.semantic_search(query, messages),
            SearchMode::Hybrid => self.hybrid_search(query, messages),
            SearchMode::Unset | SearchMode::Unknown => unreachable!("resolve_mode never returns Unset or Unknown"),
        }
    }

    fn exact_search(&self, query: &str, messages: &[Message]) -> Vec<ScoredMessage> {
        let weight = self.weight("exact", 1.0);
        let normalized_query = normalize_unicode(query).to_lowercase();
        let alternatives = query_alternatives(&normalized_query);

        let mut out = Vec::new();
        for msg in messages {
            let text = normalize_unicode(&msg.text).to_lowercase();
            if text.is_empty() {
                continue;
            }
            for alt in &alternatives {
                if alt.is_empty() {
                    continue;
                }
                if let Some(first_idx) = text.find(alt.as_str()) {
                    let match_count = text.matches(alt.as_str()).count();
                    let position_factor = 1.0 - (first_idx as f64 / text.len() as f64);
                    let mut score = weight * (0.6 + 0.2 * (match_count.min(5) as f64) + 0.2 * position_factor);
                    if alt != &normalized_query {
                        score *= 0.9;
                    }
                    out.push(ScoredMessage::new(score, msg.clone()));
                    break;
                }
            }
        }
        sort_scored_stable(&mut out);
        out
    }

    /// Rewrites a contraction occurrence in `query` into an alternation
    /// group with optional apostrophes (`['']?`), mirroring the exact
    /// mode's alternative forms but as a single regex instead of a
    /// scored list of candidate strings.
    fn rewrite_regex_query(query: &str) -> String {
        let lower = query.to_lowercase();
        let Some((contraction, expansions)) = chatgate_domain::contractions::find_contraction(&lower) else {
            return query.to_string();
        };
        let Some(idx) = lower.find(contraction) else {
            return query.to_string();
        };
        let end = idx + contraction.len();

        let mut variants = vec![contraction.to_string()];
        variants.extend(expansions.iter().map(|s| s.to_string()));
        let parts: Vec<String> = variants.iter().map(|v| regex::escape(v).replace('\'', "['']?")).collect();
        let group = format!("({})", parts.join("|"));

        format!("{}{}{}", &query[..idx], group, &query[end..])
    }

    fn regex_search(&self, query: &str, messages: &[Message]) -> Vec<ScoredMessage> {
        let weight = self.weight("regex", 1.0);
        let opts = self.config.mode("regex").map(|m| m.options.clone()).unwrap_or_default();
        let ignore_case = opts.ignore_case.unwrap_or(true);
        let dot_all = opts.dot_all.unwrap_or(false);
        let unicode = opts.unicode.unwrap_or(true);
        let max_pattern_length = opts.max_pattern_length.unwrap_or(1000);

        let normalized_query = normalize_unicode(query);
        let mut pattern = Self::rewrite_regex_query(&normalized_query);
        if pattern.len() > max_pattern_length {
            pattern.truncate(max_pattern_length);
        }

        let compiled = RegexBuilder::new(&pattern)
            .case_insensitive(ignore_case)
            .dot_matches_new_line(dot_all)
            .unicode(unicode)
            .build();

        let Ok(re) = compiled else {
            tracing::warn!(pattern = %pattern, "invalid regex pattern, falling back to exact search");
            return self.exact_search(query, messages);
        };

        let mut out = Vec::new();
        for msg in messages {
            let text = normalize_unicode(&msg.text);
            if text.is_empty() {
                continue;
            }
            let matches: Vec<_> = re.find_iter(&text).collect();
            if matches.is_empty() {
                continue;
            }
            let match_count = matches.len();
            let first_pos = matches[0].start() as f64 / text.len() as f64;
            let position_factor = 1.0 - first_pos;
            let score = weight * (0.6 + 0.2 * (match_count.min(5) as f64) + 0.2 * position_factor);
            out.push(ScoredMessage::new(score, msg.clone()));
        }
        sort_scored_stable(&mut out);
        out
    }

    fn semantic_search(&self, query: &str, messages: &[Message]) -> Vec<ScoredMessage> {
        let Some(embedder) = &self.embedder else {
            return self.exact_search(query, messages);
        };
        let weight = self.weight("semantic", 1.5);
        let mode_cfg = self.config.mode("semantic");
        let threshold = mode_cfg.map(|m| m.effective_similarity_threshold()).unwrap_or(0.6);
        let metric = mode_cfg
            .and_then(|m| m.options.similarity_metric.as_deref())
            .and_then(SimilarityMetric::parse)
            .unwrap_or(SimilarityMetric::Cosine);

        let Some(query_vector) = embedder.embed(query.trim()) else {
            return self.exact_search(query, messages);
        };

        let mut candidates: Vec<(f64, &Message)> = Vec::new();
        for msg in messages {
            if msg.text.is_empty() {
                continue;
            }
            if let Some(msg_vector) = embedder.embed(&msg.text) {
                let s = chatgate_embed::similarity(&query_vector, &msg_vector, metric);
                candidates.push((s, msg));
            }
        }

        let mut out = Vec::new();
        if candidates.len() >= 10 {
            candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            let min_threshold = threshold * 0.8;
            let top_count = (candidates.len() as f64 * 0.2).floor().max(1.0) as usize;
            for (s, msg) in candidates.into_iter().take(top_count) {
                if s >= min_threshold {
                    out.push(ScoredMessage::new(weight * s, msg.clone()));
                }
            }
        } else {
            for (s, msg) in candidates {
                if s >= threshold {
                    out.push(ScoredMessage::new(weight * s, msg.clone()));
                }
            }
        }

        sort_scored_stable(&mut out);
        out
    }

    /// Combines exact/regex/semantic independently, accumulating
    /// `hybrid_weight[mode] * sub_score` per message, with a multi-mode
    /// bonus of `0.2 * score * (modesMatched - 1)` (spec §4.7 hybrid
    /// mode; the literal local-variable scan in the source is
    /// deliberately not reproduced, per spec §9 open questions).
    fn hybrid_search(&self, query: &str, messages: &[Message]) -> Vec<ScoredMessage> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        let mut mode_hits: HashMap<String, u32> = HashMap::new();
        let mut by_name: HashMap<String, Message> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let sub_modes: [(&str, fn(&Self, &str, &[Message]) -> Vec<ScoredMessage>); 3] = [
            ("exact", Self::exact_search),
            ("regex", Self::regex_search),
            ("semantic", Self::semantic_search),
        ];

        for (name, run) in sub_modes {
            if name != "semantic" && !self.config.is_mode_enabled(name) {
                continue;
            }
            if name == "semantic" && !(self.config.is_mode_enabled("semantic") && self.semantic_available()) {
                continue;
            }
            let hybrid_weight = self.config.search.hybrid_weights.get(name).copied().unwrap_or(1.0);
            for sm in run(self, query, messages) {
                let key = sm.message.name.clone();
                *scores.entry(key.clone()).or_insert(0.0) += hybrid_weight * sm.score;
                *mode_hits.entry(key.clone()).or_insert(0) += 1;
                by_name.entry(key.clone()).or_insert_with(|| sm.message.clone());
                if seen.insert(key.clone()) {
                    order.push(key);
                }
            }
        }

        for (key, hits) in &mode_hits {
            if *hits > 1 {
                if let Some(score) = scores.get_mut(key) {
                    let bonus = 0.2 * *score * (*hits as f64 - 1.0);
                    *score += bonus;
                }
            }
        }

        let mut out: Vec<ScoredMessage> = order
            .into_iter()
            .filter_map(|key| {
                let score = *scores.get(&key)?;
                let message = by_name.remove(&key)?;
                Some(ScoredMessage::new(score, message))
            })
            .collect();
        sort_scored_stable(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_domain::config::{ModeOptions, SearchConfigDocument, SearchModeConfig, SearchSettings};
    use std::collections::HashMap;

    fn config(default_mode: &str) -> SearchConfigDocument {
        SearchConfigDocument {
            search_modes: vec![
                SearchModeConfig { name: "exact".into(), enabled: true, weight: 1.0, similarity_threshold: None, options: ModeOptions::default() },
                SearchModeConfig { name: "regex".into(), enabled: true, weight: 1.2, similarity_threshold: None, options: ModeOptions::default() },
                SearchModeConfig {
                    name: "semantic".into(),
                    enabled: true,
                    weight: 1.5,
                    similarity_threshold: Some(0.6),
                    options: ModeOptions { similarity_metric: Some("cosine".into()), ..Default::default() },
                },
            ],
            search: SearchSettings {
                default_mode: default_mode.to_string(),
                hybrid_weights: HashMap::from([("exact".to_string(), 0.3), ("regex".to_string(), 0.3), ("semantic".to_string(), 0.4)]),
            },
        }
    }

    fn msg(id: &str, text: &str) -> Message {
        Message::new(format!("spaces/A/messages/{id}"), text, "2024-06-01T00:00:00Z")
    }

    #[test]
    fn unknown_mode_falls_back_to_exact() {
        let engine = SearchEngine::new(config("exact"), None);
        assert_eq!(engine.resolve_mode(SearchMode::parse(Some("bogus"))), SearchMode::Exact);
    }

    #[test]
    fn unknown_mode_falls_back_to_exact_even_when_default_mode_is_not_exact() {
        // An unrecognized mode string must resolve to exact regardless of
        // default_mode — it is a distinct case from an unset/absent mode,
        // which is the one that consults default_mode.
        let engine = SearchEngine::new(config("regex"), None);
        assert_eq!(engine.resolve_mode(SearchMode::parse(Some("bogus"))), SearchMode::Exact);
        assert_eq!(engine.resolve_mode(SearchMode::Unset), SearchMode::Regex);
    }

    #[test]
    fn semantic_without_embedder_falls_back_to_exact() {
        let engine = SearchEngine::new(config("exact"), None);
        assert_eq!(engine.resolve_mode(SearchMode::Semantic), SearchMode::Exact);
    }

    #[test]
    fn disabled_mode_falls_back_to_exact() {
        let mut cfg = config("exact");
        cfg.search_modes.iter_mut().find(|m| m.name == "regex").unwrap().enabled = false;
        let engine = SearchEngine::new(cfg, None);
        assert_eq!(engine.resolve_mode(SearchMode::Regex), SearchMode::Exact);
    }

    #[test]
    fn exact_search_smart_quote_and_contraction_alternative() {
        let engine = SearchEngine::new(config("exact"), None);
        let messages = vec![msg("1", "don't forget"), msg("2", "do not forget please"), msg("3", "unrelated")];
        let results = engine.search("don\u{2019}t forget", &messages, SearchMode::Exact);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].message.name, "spaces/A/messages/1");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn exact_search_matches_sibling_contraction() {
        // "don't" must also match a message containing only "didn't" (spec.md:123).
        let engine = SearchEngine::new(config("exact"), None);
        let messages = vec![msg("1", "didn't forget"), msg("2", "unrelated")];
        let results = engine.search("don't forget", &messages, SearchMode::Exact);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message.name, "spaces/A/messages/1");
    }

    #[test]
    fn regex_contraction_alternation_matches_both_forms() {
        let engine = SearchEngine::new(config("regex"), None);
        let messages = vec![msg("1", "do not open"), msg("2", "don't open"), msg("3", "open")];
        let results = engine.search("don't open", &messages, SearchMode::Regex);
        let names: HashSet<_> = results.iter().map(|r| r.message.name.clone()).collect();
        assert!(names.contains("spaces/A/messages/1"));
        assert!(names.contains("spaces/A/messages/2"));
        assert!(!names.contains("spaces/A/messages/3"));
    }

    #[test]
    fn regex_contraction_alternation_matches_sibling_contraction() {
        let engine = SearchEngine::new(config("regex"), None);
        // "don't" must alternate in "didn't" too, not just its own "do not" expansion.
        let messages = vec![msg("1", "didn't open"), msg("2", "open")];
        let results = engine.search("don't open", &messages, SearchMode::Regex);
        let names: HashSet<_> = results.iter().map(|r| r.message.name.clone()).collect();
        assert!(names.contains("spaces/A/messages/1"));
        assert!(!names.contains("spaces/A/messages/2"));
    }

    #[test]
    fn invalid_regex_falls_back_to_exact_silently() {
        let engine = SearchEngine::new(config("regex"), None);
        let messages = vec![msg("1", "a(b")];
        let results = engine.search("a(b", &messages, SearchMode::Regex);
        // "a(b" is an invalid regex (unbalanced group) but a valid exact substring.
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn semantic_dynamic_thresholding_keeps_top_20_percent() {
        use chatgate_embed::EmbeddingProvider;
        let embedder = Arc::new(EmbeddingProvider::new("test-model", 100));
        let engine = SearchEngine::new(config("semantic"), Some(embedder));

        // 20 distinct messages; semantic scoring here is driven by the
        // deterministic hashed embedding, not literal similarity values,
        // so this exercises the dynamic-thresholding *mechanism* (top
        // 20% kept, rest dropped) rather than asserting exact scores.
        let messages: Vec<Message> = (0..20).map(|i| msg(&i.to_string(), &format!("distinct token sequence number {i}"))).collect();
        let results = engine.search("distinct token sequence", &messages, SearchMode::Semantic);
        assert!(results.len() <= 4);
    }

    #[test]
    fn hybrid_mode_gives_multi_mode_bonus() {
        let engine = SearchEngine::new(config("hybrid"), None);
        // "meeting" matches both exact and regex; "xyz" only matches exact-style text differently.
        let messages = vec![msg("1", "meeting notes here"), msg("2", "unrelated text")];
        let results = engine.search("meeting", &messages, SearchMode::Hybrid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message.name, "spaces/A/messages/1");
    }

    #[test]
    fn results_are_sorted_by_score_descending() {
        let engine = SearchEngine::new(config("exact"), None);
        let messages = vec![
            msg("1", "zzz needle zzz"),
            msg("2", "needle at the very start of this much longer message body"),
        ];
        let results = engine.search("needle", &messages, SearchMode::Exact);
        assert!(results[0].score >= results[1].score);
    }
}
