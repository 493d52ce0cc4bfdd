use std::collections::HashSet;

/// Minimum token length kept by [`tokenize`]. Two characters captures short
/// but meaningful words like "tv", "id" and house numbers.
const MIN_TOKEN_LEN: usize = 2;

/// Tokens longer than this count as significant for claim verification.
const SIGNIFICANT_TOKEN_LEN: usize = 3;

/// Splits free text into case-folded alphanumeric tokens of length >= 2.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Token-overlap similarity in [0.0, 1.0].
///
/// Defined as |intersection| / max(|tokens_a|, |tokens_b|) over the distinct
/// token sets, so swapping the arguments never changes the result. Returns
/// 0.0 when either side yields no tokens.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = tokenize(a).into_iter().collect();
    let tokens_b: HashSet<String> = tokenize(b).into_iter().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    intersection as f64 / tokens_a.len().max(tokens_b.len()) as f64
}

/// Case-folded tokens of length > 3, the signal words used when checking a
/// claimant's secret-marks answer against the recorded unique marks.
pub fn significant_tokens(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > SIGNIFICANT_TOKEN_LEN)
        .collect()
}

/// True when the two texts share at least one significant token.
///
/// Returns false when `recorded` has no significant tokens at all; callers
/// decide separately whether an empty record auto-passes verification.
pub fn shares_significant_token(recorded: &str, submitted: &str) -> bool {
    let recorded = significant_tokens(recorded);
    if recorded.is_empty() {
        return false;
    }
    let submitted = significant_tokens(submitted);
    !recorded.is_disjoint(&submitted)
}
