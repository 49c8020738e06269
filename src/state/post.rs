use chrono::{DateTime, Utc};

/// One post of a thread, as extracted from a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Forum-wide post id; increases with posting order
    pub id: i64,

    /// Author's user id (0 for guests or when the page does not expose it)
    pub author_id: i64,

    /// Author's display name
    pub author_name: String,

    /// Plain-text body
    pub body: String,

    /// When the post was made
    pub posted_at: DateTime<Utc>,

    /// Absolute link to the post
    pub permalink: String,
}

/// The contents of one fetched page of a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// Posts in document order (chronological within the page)
    pub posts: Vec<Post>,

    /// Highest page number reported by the page's own pagination control
    pub total_pages: u32,

    /// Number of post elements skipped because they could not be parsed
    pub skipped: usize,
}

impl PageResult {
    /// Highest post id on this page, if any
    pub fn max_post_id(&self) -> Option<i64> {
        self.posts.iter().map(|p| p.id).max()
    }
}
