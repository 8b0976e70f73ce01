// Similarity scores in percent, computed over already-normalized strings.
use std::collections::BTreeSet;

/// Edit-distance ratio: normalized Levenshtein similarity scaled to 0..=100.
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best ratio of the shorter string against every equally long window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let long_chars: Vec<char> = long.chars().collect();
    let mut best: f64 = 0.0;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(short, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Token-set comparison: the shared tokens are compared against each side's
/// shared tokens plus its remainder, and both remainders against each other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let common_str = common.join(" ");
    let combined_a = join_parts(&common_str, &only_a.join(" "));
    let combined_b = join_parts(&common_str, &only_b.join(" "));

    let mut best = ratio(&combined_a, &combined_b);
    if !common_str.is_empty() {
        best = best
            .max(ratio(&common_str, &combined_a))
            .max(ratio(&common_str, &combined_b));
    }
    best
}

fn join_parts(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{} {}", head, tail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_identical_strings_is_full() {
        assert_eq!(ratio("joao lourenco", "joao lourenco"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn one_typo_keeps_a_high_ratio() {
        let score = ratio("joao lourenco", "joao lourenso");
        assert!(score > 92.0 && score < 93.0, "score was {}", score);
    }

    #[test]
    fn partial_ratio_finds_embedded_name() {
        assert_eq!(partial_ratio("manuel vicente", "sr manuel vicente ministro"), 100.0);
        assert_eq!(partial_ratio("sr manuel vicente ministro", "manuel vicente"), 100.0);
        assert!(partial_ratio("manuel vicente", "carolina cerqueira") < 60.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
    }

    #[test]
    fn token_set_ignores_order_and_extra_tokens() {
        assert_eq!(token_set_ratio("jose eduardo dos santos", "santos jose eduardo"), 100.0);
        assert_eq!(token_set_ratio("isabel dos santos", "isabel dos santos"), 100.0);
    }

    #[test]
    fn token_set_scores_typos_on_remainders() {
        let score = token_set_ratio("joao lourenco", "joao lourenso");
        assert!(score > 92.0 && score < 93.0, "score was {}", score);
    }

    #[test]
    fn token_set_rejects_unrelated_names() {
        assert!(token_set_ratio("maria fernanda", "carlos alberto") < 50.0);
        assert_eq!(token_set_ratio("", "carlos alberto"), 0.0);
    }
}
