//! Token scoring and filter matching for the in-memory engine.

use weave_core::types::value_as_text;
use weave_core::{Document, FilterMode, Metadata, MetadataFilter};

/// Ceiling for scores earned through metadata alone, keeping them well below
/// content hits.
pub const METADATA_WEIGHT: f64 = 0.3;

/// Lower-cased whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn fraction_found(haystack: &str, tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let found = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    found as f64 / tokens.len() as f64
}

/// Share of `tokens` found as substrings of the lower-cased content.
pub fn content_score(content: &str, tokens: &[String]) -> f64 {
    fraction_found(&content.to_lowercase(), tokens)
}

/// `METADATA_WEIGHT` times the share of tokens found in any metadata value.
pub fn metadata_score(metadata: &Metadata, tokens: &[String]) -> f64 {
    let haystack = metadata.values().map(value_as_text).collect::<Vec<_>>().join("\n").to_lowercase();
    METADATA_WEIGHT * fraction_found(&haystack, tokens)
}

pub fn filter_matches(doc: &Document, filter: &MetadataFilter) -> bool {
    let own = doc.metadata.get(&filter.key).map(value_as_text);
    match filter.mode() {
        FilterMode::NestedJson => {
            let fragment = filter.json_fragment();
            own.is_some_and(|v| v == filter.value)
                || doc.metadata.values().any(|v| v.as_str().is_some_and(|s| s.contains(&fragment)))
        }
        FilterMode::Substring => own.is_some_and(|v| v.contains(&filter.value)),
        FilterMode::Exact => own.is_some_and(|v| v == filter.value),
    }
}
