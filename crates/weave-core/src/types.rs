//! Domain types shared by the live and mock engines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

pub type DocumentId = String;
pub type Metadata = Map<String, Value>;

/// Effective limit when a caller passes `top_k <= 0`.
pub const DEFAULT_TOP_K: usize = 5;

/// Marker stored in place of oversized binary-like fields in listing views.
pub const EXCLUDED_PLACEHOLDER: &str = "[base64 data excluded for performance]";

/// Fields that carry embedded image payloads and are left out of listings.
pub const OVERSIZED_FIELDS: [&str; 3] = ["image", "image_data", "base64_data"];

/// A stored document.
///
/// - `id`: opaque backend identifier
/// - `content`: primary text, may be empty
/// - `metadata`: heterogeneous values (strings, numbers, booleans, nested
///   objects or JSON-encoded strings)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Content suitable for display: never blank.
    pub fn display_content(&self) -> String {
        if self.content.is_empty() { placeholder_content(&self.id) } else { self.content.clone() }
    }
}

/// Deterministic stand-in used wherever a document has no text.
pub fn placeholder_content(id: &str) -> String {
    format!("Document ID: {id}")
}

/// Coerce a caller-supplied limit to a positive integer.
pub fn effective_top_k(top_k: i64) -> usize {
    if top_k <= 0 { DEFAULT_TOP_K } else { usize::try_from(top_k).unwrap_or(DEFAULT_TOP_K) }
}

/// A single retrieval request as handed over by the command layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub collection: String,
    pub query_text: String,
    /// Requested result count; values `<= 0` mean [`DEFAULT_TOP_K`].
    #[serde(default)]
    pub top_k: i64,
    #[serde(default)]
    pub search_metadata: bool,
    #[serde(default)]
    pub force_keyword: bool,
    #[serde(skip)]
    pub context: CallContext,
}

impl QueryRequest {
    pub fn new(collection: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self { collection: collection.into(), query_text: query_text.into(), ..Self::default() }
    }

    pub fn top_k(mut self, top_k: i64) -> Self { self.top_k = top_k; self }

    pub fn search_metadata(mut self, on: bool) -> Self { self.search_metadata = on; self }

    pub fn force_keyword(mut self, on: bool) -> Self { self.force_keyword = on; self }

    pub fn with_context(mut self, context: CallContext) -> Self { self.context = context; self }

    pub fn limit(&self) -> usize { effective_top_k(self.top_k) }
}

/// One ranked hit. `score` is meant to lie in `[0, 1]`, higher is better,
/// but distance-derived scores are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: DocumentId,
    pub content: String,
    pub metadata: Metadata,
    pub score: f64,
}

/// Deadline and cancellation state for one engine call.
///
/// Clones share the cancellation flag, so a caller can keep one copy and
/// cancel while the engine works with another.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    pub fn new() -> Self { Self::default() }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Some(Instant::now() + timeout), ..Self::default() }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline: Some(deadline), ..Self::default() }
    }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) { self.cancelled.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::SeqCst) }

    /// Fails once the call was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// A context that keeps this cancellation flag but never ends later
    /// than `timeout` from now.
    pub fn bounded(&self, timeout: Duration) -> Self {
        let cap = Instant::now() + timeout;
        let deadline = Some(self.deadline.map_or(cap, |d| d.min(cap)));
        Self { deadline, cancelled: Arc::clone(&self.cancelled) }
    }
}

/// Render a metadata value the way filters compare it: strings verbatim,
/// everything else as its JSON text.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_top_k_falls_back_to_default() {
        for k in [0, -1, -100] {
            assert_eq!(effective_top_k(k), DEFAULT_TOP_K);
        }
        assert_eq!(effective_top_k(3), 3);
        assert_eq!(QueryRequest::new("c", "q").limit(), 5);
    }

    #[test]
    fn cancelled_context_fails_check() {
        let ctx = CallContext::new();
        assert!(ctx.check().is_ok());
        let shared = ctx.clone();
        shared.cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_fails_check() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn bounded_never_extends_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let bounded = ctx.bounded(Duration::from_secs(60));
        assert_eq!(bounded.deadline(), ctx.deadline());
    }

    #[test]
    fn value_text_rendering() {
        assert_eq!(value_as_text(&Value::from("image")), "image");
        assert_eq!(value_as_text(&Value::from(1024)), "1024");
        assert_eq!(value_as_text(&Value::from(true)), "true");
    }
}
