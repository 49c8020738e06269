/// Durable marker of how far a thread has been scanned
///
/// One record exists per thread. A fresh record starts at page 1 with post id
/// 0, meaning "never scanned". Both fields only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadWatermark {
    /// Numeric thread identifier
    pub thread_id: i64,

    /// Highest page number that has been fully scanned (>= 1)
    pub last_page: u32,

    /// Highest post id seen so far (0 = never scanned)
    pub last_post_id: i64,
}

impl ThreadWatermark {
    /// The watermark a thread gets on first sight
    pub fn initial(thread_id: i64) -> Self {
        Self {
            thread_id,
            last_page: 1,
            last_post_id: 0,
        }
    }

    /// Returns true if a post with this id has not been delivered yet
    pub fn is_new(&self, post_id: i64) -> bool {
        post_id > self.last_post_id
    }
}
