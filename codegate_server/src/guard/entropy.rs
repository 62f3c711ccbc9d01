//! Identity-string diversity signal
//!
//! A client replaying one identity string on every request scores near
//! zero entropy; organic traffic mixes versions and tools and lands
//! higher. Low entropy is a weak automation signal, consumed
//! probabilistically by the decision engine.

use std::collections::HashMap;
use std::collections::VecDeque;

/// Shannon entropy in bits over the frequency distribution of `values`.
/// Empty input scores 0.0.
pub fn shannon<S: AsRef<str>>(values: &[S]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_ref()).or_insert(0) += 1;
    }

    let total = values.len() as f64;
    counts.values().fold(0.0, |entropy, &n| {
        let p = n as f64 / total;
        entropy - p * p.log2()
    })
}

/// Whether the last `window` entries of the history score below the
/// entropy threshold. Histories shorter than `window` are scored over
/// whatever is present.
pub fn is_suspicious(history: &VecDeque<String>, window: usize, threshold: f64) -> bool {
    let start = history.len().saturating_sub(window);
    let recent: Vec<&str> = history.iter().skip(start).map(String::as_str).collect();
    shannon(&recent) < threshold
}
