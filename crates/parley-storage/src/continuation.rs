// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Continuation digest for threads longer than the context window.
//!
//! Older messages are compacted extractively: each becomes one truncated line,
//! and only the newest [`DIGEST_LINES`] of them are listed. The header naming
//! topic, agent and model is always present, even when nothing was compacted.

use parley_core::types::{ContinuationContext, StoredMessage};

/// Maximum compacted messages listed line by line in the digest.
pub const DIGEST_LINES: usize = 8;

/// Maximum characters kept from each compacted message.
pub const LINE_CHARS: usize = 120;

/// Builds the summary string for a thread.
///
/// `compacted` counts every message older than the verbatim window; `older`
/// holds the newest of those messages, oldest first.
pub fn build_summary(
    topic: &str,
    agent: &str,
    model: &str,
    compacted: usize,
    older: &[StoredMessage],
) -> String {
    let mut summary = ContinuationContext::identity_header(topic, agent, model);
    if compacted == 0 {
        return summary;
    }

    summary.push_str(&format!("\nEarlier messages compacted: {compacted}"));
    let shown = older.len().min(DIGEST_LINES);
    let skipped = compacted.saturating_sub(shown);
    if skipped > 0 {
        summary.push_str(&format!("\n- ... {skipped} older message(s) omitted"));
    }
    for message in older.iter().rev().take(DIGEST_LINES).rev() {
        summary.push_str(&format!(
            "\n- {}: {}",
            message.role,
            one_line(&message.content, LINE_CHARS)
        ));
    }
    summary
}

/// Collapses whitespace and truncates to `max_chars`, marking the cut with an ellipsis.
pub fn one_line(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
