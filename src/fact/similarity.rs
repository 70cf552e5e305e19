//! Lexical similarity between two fact texts.

use std::collections::HashSet;

/// Jaccard index over the sets of lowercase whitespace-delimited tokens.
///
/// Symmetric. Returns `0.0` when both inputs tokenize to nothing.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    shared as f64 / union as f64
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
