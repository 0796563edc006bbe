use anyhow::{Context, Result};
use tracing::debug;

use crate::platform::{ConversationTarget, Transport};

/// Maximum characters per outbound message.
pub const SEGMENT_MAX_CHARS: usize = 500;

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Cuts exactly at the limit, never inside a character. An empty input gives
/// a single empty segment.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut rest = text;

    loop {
        match rest.char_indices().nth(max_chars) {
            Some((cut, _)) => {
                let (head, tail) = rest.split_at(cut);
                segments.push(head);
                rest = tail;
            }
            None => {
                segments.push(rest);
                return segments;
            }
        }
    }
}

/// Send `text` to `target` in order, one segment at a time.
///
/// Stops at the first failed send; later segments are not attempted.
pub async fn deliver(
    transport: &dyn Transport,
    target: &ConversationTarget,
    text: &str,
) -> Result<()> {
    let segments = split_segments(text, SEGMENT_MAX_CHARS);
    let total = segments.len();

    for (i, segment) in segments.into_iter().enumerate() {
        transport
            .send(target, segment)
            .await
            .with_context(|| format!("Failed to send segment {}/{} to {}", i + 1, total, target))?;
        debug!("Sent segment {}/{} to {}", i + 1, total, target);
    }

    Ok(())
}
