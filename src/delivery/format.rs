//! Message formatting
//!
//! Turns a delivered post into the text block published to the channel:
//!
//! ```text
//! Thread #12345
//! On 2021-01-01 07:00:00 UTC, alice said:
//! <body excerpt>
//! See more: https://forum.example.com/posts/101/
//! ```

use crate::delivery::traits::OutboundMessage;
use crate::state::Post;

/// Default maximum body excerpt length, in characters
pub const DEFAULT_EXCERPT_CHARS: usize = 1000;

/// Formatting options for outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFormat {
    /// Maximum number of body characters included in a message
    pub excerpt_chars: usize,
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self {
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl MessageFormat {
    /// Renders one post of `thread_id` as an outbound message
    pub fn render(&self, thread_id: i64, post: &Post) -> OutboundMessage {
        let text = format!(
            "Thread #{}\nOn {}, {} said:\n{}\nSee more: {}",
            thread_id,
            post.posted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            post.author_name,
            excerpt(&post.body, self.excerpt_chars),
            post.permalink
        );

        OutboundMessage {
            thread_id,
            post_id: post.id,
            text,
        }
    }
}

/// Trims a body and cuts it to at most `max_chars` UTF-16 code units
///
/// Telegram measures message length in UTF-16 units, so an emoji outside the
/// BMP counts twice. Cut excerpts end with `…`. Runs of blank lines are
/// squeezed to one.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let mut squeezed = String::with_capacity(body.len());
    let mut blank_run = 0;
    for line in body.trim().lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !squeezed.is_empty() {
            squeezed.push('\n');
        }
        squeezed.push_str(line);
    }

    if squeezed.encode_utf16().count() <= max_chars {
        return squeezed;
    }

    let mut units = 0;
    let cut: String = squeezed
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max_chars
        })
        .collect();
    format!("{}…", cut.trim_end())
}
