use serde::Serialize;

/// Best approximate match of free text against a category list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatch {
    pub name: String,
    pub score: f64,
}

/// Case-insensitive normalized Levenshtein match.
///
/// Returns the highest-scoring candidate if its similarity reaches
/// `threshold`; earlier candidates win ties.
pub fn match_category<S: AsRef<str>>(
    input: &str,
    candidates: &[S],
    threshold: f64,
) -> Option<CategoryMatch> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<CategoryMatch> = None;
    for candidate in candidates {
        let name = candidate.as_ref();
        let score = strsim::normalized_levenshtein(&needle, &name.to_lowercase());
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(CategoryMatch {
                name: name.to_string(),
                score,
            });
        }
    }

    match best {
        Some(found) if found.score >= threshold => Some(found),
        other => {
            tracing::debug!(input, best = ?other, threshold, "No category above threshold");
            None
        }
    }
}
