use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\.(\d{3}))?\b").expect("valid timestamp regex")
});

/// A timestamp found in text, with the text that follows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedText {
    /// Timestamp as written, e.g. `1:02:03`
    pub timestamp: String,
    /// Offset in seconds
    pub seconds: f64,
    /// Text up to the next timestamp, trimmed
    pub text: String,
}

/// Find `M:SS`, `H:MM:SS` and `H:MM:SS.mmm` timestamps and pair each with
/// the text that follows it.
///
/// A two-field timestamp is read as minutes and seconds, the way video
/// players print offsets under an hour, so `12:34` has `seconds == 754.0`.
pub fn extract_timestamps(text: &str) -> Vec<TimestampedText> {
    let matches: Vec<_> = TIMESTAMP.captures_iter(text).collect();

    matches
        .iter()
        .enumerate()
        .map(|(i, caps)| {
            let whole = caps.get(0).expect("capture 0 always present");
            let body_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());

            TimestampedText {
                timestamp: whole.as_str().to_string(),
                seconds: to_seconds(caps),
                text: text[whole.end()..body_end].trim().to_string(),
            }
        })
        .collect()
}

fn to_seconds(caps: &regex::Captures<'_>) -> f64 {
    let field = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let millis = field(4) / 1000.0;
    match caps.get(3) {
        // H:MM:SS
        Some(_) => field(1) * 3600.0 + field(2) * 60.0 + field(3) + millis,
        // M:SS
        None => field(1) * 60.0 + field(2) + millis,
    }
}
