use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// The bytes to write out and the name to give them.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

/// `{stem}_edited_{timestamp}.{ext}`, where the timestamp is the UTC
/// ISO-8601 form with `:` and `.` replaced by `-`.
///
/// The extension is whatever follows the last dot, so `.pdf` gives an empty
/// stem. A name with no dot, or ending in one, gets `pdf` as its extension.
pub fn edited_file_name(original: &str, at: DateTime<Utc>) -> String {
    let timestamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let (stem, ext) = match original.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        Some((stem, _)) => (stem, "pdf"),
        None => (original, "pdf"),
    };
    format!("{stem}_edited_{timestamp}.{ext}")
}
