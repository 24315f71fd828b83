//! Diversity selection phase: top-K that avoids near-duplicate dishes.

use std::collections::HashSet;

use crate::types::{Comparison, ScoredCandidate};

use super::RankingConfig;

/// Title tokens with stop words removed, lowercased.
fn key_tokens(title: &str, stop_words: &[String]) -> HashSet<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !stop_words.iter().any(|sw| sw == word))
        .map(|word| word.to_string())
        .collect()
}

/// Two similarity tests, either one sufficient to call the titles the same
/// dish: a shared-key-word count and an overlap ratio against the smaller
/// token set.
fn same_dish(a: &HashSet<String>, b: &HashSet<String>, config: &RankingConfig) -> bool {
    let shared = a.intersection(b).count();

    if shared >= config.min_shared_tokens {
        return true;
    }

    if !a.is_empty() && !b.is_empty() {
        let overlap = shared as f64 / a.len().min(b.len()) as f64;
        if overlap > config.max_overlap_ratio {
            return true;
        }
    }

    false
}

/// Select up to `config.top_k` candidates from a score-sorted slice.
///
/// The highest-scoring candidate is always taken. Later candidates are
/// rejected when they read as the same dish as anything already selected;
/// survivors are accepted while there is room, with preference encoded for
/// those that add an uncovered technique tag. If the similarity pass comes
/// up short, a backfill pass appends remaining candidates in score order,
/// similarity ignored, until K is reached or candidates run out.
pub fn diverse_top_k(scored: &[ScoredCandidate], config: &RankingConfig) -> Vec<ScoredCandidate> {
    if scored.len() <= config.top_k {
        return scored.to_vec();
    }

    let mut selected: Vec<ScoredCandidate> = vec![scored[0].clone()];
    let mut selected_tokens: Vec<HashSet<String>> = vec![key_tokens(
        &scored[0].candidate.title,
        &config.stop_words,
    )];
    let mut covered_tags: HashSet<String> = scored[0]
        .candidate
        .techniques
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    for candidate in &scored[1..] {
        if selected.len() >= config.top_k {
            break;
        }

        let tokens = key_tokens(&candidate.candidate.title, &config.stop_words);
        if selected_tokens
            .iter()
            .any(|existing| same_dish(&tokens, existing, config))
        {
            tracing::debug!(
                title = %candidate.candidate.title,
                "skipping near-duplicate of an already selected recipe"
            );
            continue;
        }

        let adds_new_tag = candidate
            .candidate
            .techniques
            .iter()
            .any(|t| !covered_tags.contains(&t.to_lowercase()));

        if adds_new_tag || selected.len() < config.top_k {
            covered_tags.extend(
                candidate
                    .candidate
                    .techniques
                    .iter()
                    .map(|t| t.to_lowercase()),
            );
            selected_tokens.push(tokens);
            selected.push(candidate.clone());
        }
    }

    // Backfill: too few diverse picks, fill with the best of the rest.
    if selected.len() < config.top_k {
        for candidate in scored {
            if selected.len() >= config.top_k {
                break;
            }
            if !selected
                .iter()
                .any(|s| s.candidate.url == candidate.candidate.url)
            {
                selected.push(candidate.clone());
            }
        }
    }

    selected
}

/// Compare the two leading items of a selection by their technique lists.
///
/// Returns [`Comparison::NotApplicable`] for selections smaller than two;
/// otherwise the intersection of the first two technique lists, first
/// item's order, capped at 3.
pub fn compare_leading(items: &[(String, Vec<String>)]) -> Comparison {
    let [(first_title, first_techniques), (second_title, second_techniques), ..] = items else {
        return Comparison::NotApplicable;
    };

    let second_set: HashSet<&str> = second_techniques.iter().map(|s| s.as_str()).collect();
    let mut shared: Vec<String> = Vec::new();
    for technique in first_techniques {
        if second_set.contains(technique.as_str()) && !shared.contains(technique) {
            shared.push(technique.clone());
            if shared.len() == 3 {
                break;
            }
        }
    }

    Comparison::SideBySide {
        first_focus: first_title.clone(),
        second_focus: second_title.clone(),
        shared_techniques: shared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::test_support::candidate;
    use crate::types::ScoredCandidate;

    fn scored(title: &str, url: &str, score: f64, techniques: &[&str]) -> ScoredCandidate {
        let mut c = candidate(title, url);
        c.techniques = techniques.iter().map(|s| s.to_string()).collect();
        ScoredCandidate {
            candidate: c,
            score,
        }
    }

    #[test]
    fn rejects_shared_key_word_duplicates() {
        let list = vec![
            scored(
                "Red Wine Pan Sauce Chicken Recipe",
                "https://a.test/1",
                90.0,
                &["deglazing"],
            ),
            scored(
                "Red Wine Reduction Pan Sauce Recipe",
                "https://a.test/2",
                85.0,
                &["reduction"],
            ),
            scored(
                "Lemon Butter Fish",
                "https://a.test/3",
                80.0,
                &["emulsification"],
            ),
            scored("Garlic Confit", "https://a.test/4", 70.0, &["confit"]),
        ];

        let selected = diverse_top_k(&list, &RankingConfig::default());

        let titles: Vec<&str> = selected.iter().map(|s| s.candidate.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Red Wine Pan Sauce Chicken Recipe",
                "Lemon Butter Fish",
                "Garlic Confit"
            ]
        );
    }

    #[test]
    fn overlap_ratio_rejects_short_title_near_duplicates() {
        let list = vec![
            scored("Classic Beef Bourguignon", "https://a.test/1", 90.0, &["braising"]),
            // Shares only "bourguignon" (1 token < 2), but 1/min(1,2) > 0.3.
            scored("Bourguignon", "https://a.test/2", 85.0, &["stewing"]),
            scored("Seared Scallops", "https://a.test/3", 80.0, &["searing"]),
            scored("Potato Galette", "https://a.test/4", 75.0, &["layering"]),
        ];

        let selected = diverse_top_k(&list, &RankingConfig::default());
        let titles: Vec<&str> = selected.iter().map(|s| s.candidate.title.as_str()).collect();
        assert!(!titles.contains(&"Bourguignon"));
    }

    #[test]
    fn backfills_when_everything_is_similar() {
        let list = vec![
            scored("Red Wine Pan Sauce", "https://a.test/1", 90.0, &["deglazing"]),
            scored("Red Wine Pan Sauce Two", "https://a.test/2", 85.0, &["deglazing"]),
            scored("Red Wine Pan Sauce Three", "https://a.test/3", 80.0, &["deglazing"]),
            scored("Red Wine Pan Sauce Four", "https://a.test/4", 75.0, &["deglazing"]),
        ];

        let selected = diverse_top_k(&list, &RankingConfig::default());

        // Similarity leaves only the leader; backfill tops up to K in
        // score order.
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].candidate.url, "https://a.test/1");
        assert_eq!(selected[1].candidate.url, "https://a.test/2");
        assert_eq!(selected[2].candidate.url, "https://a.test/3");
    }

    #[test]
    fn small_input_is_returned_whole() {
        let list = vec![
            scored("One", "https://a.test/1", 90.0, &[]),
            scored("Two", "https://a.test/2", 85.0, &[]),
        ];
        let selected = diverse_top_k(&list, &RankingConfig::default());
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn compare_leading_needs_two_items() {
        assert_eq!(compare_leading(&[]), Comparison::NotApplicable);
        assert_eq!(
            compare_leading(&[("Solo".to_string(), vec!["searing".to_string()])]),
            Comparison::NotApplicable
        );
    }

    #[test]
    fn compare_leading_intersects_and_caps_at_three() {
        let items = vec![
            (
                "First".to_string(),
                vec![
                    "deglazing".to_string(),
                    "reduction".to_string(),
                    "emulsification".to_string(),
                    "seasoning".to_string(),
                    "plating".to_string(),
                ],
            ),
            (
                "Second".to_string(),
                vec![
                    "plating".to_string(),
                    "deglazing".to_string(),
                    "reduction".to_string(),
                    "emulsification".to_string(),
                ],
            ),
        ];

        let Comparison::SideBySide {
            first_focus,
            second_focus,
            shared_techniques,
        } = compare_leading(&items)
        else {
            panic!("expected side-by-side comparison");
        };

        assert_eq!(first_focus, "First");
        assert_eq!(second_focus, "Second");
        assert_eq!(
            shared_techniques,
            vec!["deglazing", "reduction", "emulsification"]
        );
    }
}
