//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `ThreadWatermark`: how far a thread has been scanned (page + highest post id)
//! - `Post` / `PageResult`: what one fetched page of a thread contains
//! - `PassStatus`: the outcome of one crawl pass, as recorded in pass history

mod pass_status;
mod post;
mod watermark;

// Re-export main types
pub use pass_status::PassStatus;
pub use post::{PageResult, Post};
pub use watermark::ThreadWatermark;
