use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference the media index understands (usually a page URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A search or playlist hit returned by the media index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub source: SourceRef,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: SourceRef(source.into()),
        }
    }
}

/// A queued track. Immutable once enqueued; `seq` records enqueue order
/// within its guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub seq: u64,
    pub title: String,
    pub source: SourceRef,
}
