//! Formats a thread summary into a Slack block message body.

use serde::{Deserialize, Serialize};

use crate::analysis::types::{SummaryStatus, ThreadSummary};
use crate::clients::slack::ThreadRoot;

/// A `section` block with mrkdwn text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: MrkdwnText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrkdwnText {
    #[serde(rename = "type")]
    pub text_type: String,
    pub text: String,
}

/// Block-formatted message body posted under the thread root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryBlocks {
    pub blocks: Vec<SectionBlock>,
}

fn section(text: impl Into<String>) -> SectionBlock {
    SectionBlock {
        block_type: "section".to_string(),
        text: MrkdwnText {
            text_type: "mrkdwn".to_string(),
            text: text.into(),
        },
    }
}

/// Map a summary to its chat reply body.
///
/// Resolved threads get a two-block message (header + summary); unresolved
/// or in-progress threads get a third trailing block asking for updates.
/// `SummaryStatus` is a closed enum, so there is no silent fallthrough for
/// unknown statuses: those already failed at parse time.
pub fn build_resolved_summary(summary: &ThreadSummary) -> SummaryBlocks {
    match summary.status {
        SummaryStatus::Resolved => SummaryBlocks {
            blocks: vec![
                section("✅ *Thread Resolved!*"),
                section(format!("*Summary:*\n{}", summary.summary)),
            ],
        },
        SummaryStatus::Unresolved | SummaryStatus::InProgress => SummaryBlocks {
            blocks: vec![
                section("⚠️ *Issue Still Unresolved*"),
                section(format!("*Summary:*\n{}", summary.summary)),
                section("_Anyone have an update on this?_"),
            ],
        },
    }
}

/// Whether a thread root already carries the given reaction.
pub fn has_reaction(root: &ThreadRoot, name: &str) -> bool {
    root.reactions.iter().any(|r| r.name == name)
}
