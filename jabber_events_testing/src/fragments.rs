//! Builders for multipart messages.

use jabber_events::{Envelope, MessageFragment};

/// Build one fragment from `sender` with a fresh live envelope.
pub fn fragment(group: &str, sender: &str, count: i64, index: i64, body: &str) -> MessageFragment {
    MessageFragment::new(group, count, index, body, Envelope::from_sender(sender))
}

/// Split `body` into `parts` fragments of group `group`, in index order.
///
/// Splits on character boundaries; trailing fragments may be empty when
/// `body` has fewer characters than `parts`.
///
/// # Panics
///
/// Panics if `parts` is zero.
pub fn split_message(group: &str, sender: &str, body: &str, parts: usize) -> Vec<MessageFragment> {
    assert!(parts > 0, "a message has at least one part");
    let chars: Vec<char> = body.chars().collect();
    let size = chars.len().div_ceil(parts).max(1);
    let count = i64::try_from(parts).expect("part count fits in i64");
    (0..parts)
        .map(|index| {
            let start = (index * size).min(chars.len());
            let end = ((index + 1) * size).min(chars.len());
            let piece: String = chars[start..end].iter().collect();
            let index = i64::try_from(index).expect("index fits in i64");
            fragment(group, sender, count, index, &piece)
        })
        .collect()
}
