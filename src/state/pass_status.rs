/// Pass status definitions for pass history
use std::fmt;

/// Outcome of one crawl pass for one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStatus {
    /// The watermark advanced (deliveries may still have failed)
    Completed,

    /// Nothing new; the watermark was left untouched
    Unchanged,

    /// The pass aborted before committing a watermark
    Failed,
}

impl PassStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "unchanged" => Some(Self::Unchanged),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
