use std::collections::HashSet;

/// Case-insensitive topic similarity in [0, 1].
///
/// Catalogers often type a truncated or rearranged form of the provider
/// topic, so containment in either direction counts as a full match; failing
/// that, the Jaccard index of the whitespace-tokenized word sets.
pub fn topic_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b || a.contains(&b) || b.contains(&a) {
        return 1.0;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
