//! Thread reference handling
//!
//! A thread is configured by its XenForo route segment, e.g.
//! `some-thread-title.12345`. The numeric suffix is the thread id used as the
//! watermark key; the whole segment is used to build page URLs of the form
//! `{base}/t/{reference}/page-{n}`.

use crate::{ThreadRefError, ThreadRefResult};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Path segment under which XenForo serves threads
const THREAD_PATH: &str = "t";

/// Prefix of the XenForo page parameter (`page-2`, `page-3`, ...)
const PAGE_PARAM: &str = "page-";

/// A parsed reference to one forum thread
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadRef {
    reference: String,
    id: i64,
}

impl ThreadRef {
    /// Parses a thread reference
    ///
    /// Accepts `slug.12345`, a bare `12345`, and tolerates surrounding
    /// whitespace, a leading `t/` or `/t/` and a trailing `/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use xf_mirror::thread::ThreadRef;
    ///
    /// let thread = ThreadRef::parse("rust-users-thread.4242").unwrap();
    /// assert_eq!(thread.id(), 4242);
    /// assert_eq!(thread.as_str(), "rust-users-thread.4242");
    /// ```
    pub fn parse(reference: &str) -> ThreadRefResult<Self> {
        let trimmed = reference.trim();
        let trimmed = trimmed
            .strip_prefix("/t/")
            .or_else(|| trimmed.strip_prefix("t/"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        if trimmed.is_empty() {
            return Err(ThreadRefError::Empty);
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ThreadRefError::InvalidCharacters(trimmed.to_string()));
        }

        let id_part = match trimmed.rsplit_once('.') {
            Some((_, id)) => id,
            None => trimmed,
        };

        let id = id_part
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ThreadRefError::MissingId(trimmed.to_string()))?;

        Ok(Self {
            reference: trimmed.to_string(),
            id,
        })
    }

    /// The numeric thread id
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The route segment as configured (normalized)
    pub fn as_str(&self) -> &str {
        &self.reference
    }

    /// Builds the URL of a given page of the thread
    ///
    /// Pages are numbered from 1. The URL always carries the explicit page
    /// parameter, even for page 1, so every request has the same shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use xf_mirror::thread::ThreadRef;
    ///
    /// let base = Url::parse("https://forum.example.com").unwrap();
    /// let thread = ThreadRef::parse("news.77").unwrap();
    /// let url = thread.page_url(&base, 3).unwrap();
    /// assert_eq!(url.as_str(), "https://forum.example.com/t/news.77/page-3");
    /// ```
    pub fn page_url(&self, base_url: &Url, page: u32) -> ThreadRefResult<Url> {
        if page == 0 {
            return Err(ThreadRefError::InvalidPage(page));
        }
        join(
            base_url,
            &format!("{}/{}/{}{}", THREAD_PATH, self.reference, PAGE_PARAM, page),
        )
    }
}

/// Joins a relative path onto the base URL, keeping any base path prefix
fn join(base_url: &Url, relative: &str) -> ThreadRefResult<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(relative)
        .map_err(|e| ThreadRefError::Url(e.to_string()))
}

impl FromStr for ThreadRef {
    type Err = ThreadRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)
    }
}
