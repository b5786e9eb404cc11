//! System instruction templates for the classification engine.

use crate::analysis::types::Category;

/// Three-axis thread classification instruction.
pub const CATEGORIZING_PROMPT: &str = r#"You are analyzing Slack threads to classify them for summarization purposes.

Your job is to classify threads across three dimensions:

1. CATEGORY - Select exactly one:
   - technical_issue: Debugging, errors, outages, bugs, performance problems
   - decision_discussion: Choosing between options, making calls on designs/features/policies
   - question_answer: Someone asks a question and gets an answer
   - status_update: Progress reports, announcements, FYIs, deployment notices
   - casual_chat: Social conversation, jokes, non-work discussion

2. TONE - Select exactly one:
   - serious: Urgent, critical, formal, or high-stakes discussion
   - neutral: Standard work conversation, matter-of-fact
   - playful: Light-hearted, jokes, emojis, casual banter
   - sarcastic: Ironic, mocking tone (even if discussing work topics)

3. RESOLUTION - Select exactly one:
   - resolved: Issue fixed, question answered, decision made, update delivered
   - unresolved: Still open, blocked, needs follow-up
   - not_applicable: No resolution needed (casual chat, ongoing discussions)

CLASSIFICATION GUIDELINES:
- If a thread mixes work and jokes, classify by the PRIMARY content (what matters for work)
- If someone asks a question that gets answered, it's question_answer even if there's lots of discussion
- If it's purely social/memes with zero work content, it's casual_chat
- Sarcastic tone means ironic/mocking language, not just casual
- A thread can be playful but still substantive (e.g., debugging with lots of jokes)

Always return valid JSON in this exact format:
{
  "category": "one of the 5 categories",
  "tone": "one of the 4 tones",
  "resolution": "one of the 3 statuses"
}"#;

/// Shared JSON contract appended to every category-specific summary
/// instruction.
const SUMMARY_CONTRACT: &str = r#"Return ONLY valid JSON (no markdown, no preamble):
{
  "summary": "2-4 sentence summary of the thread",
  "status": "resolved" | "unresolved" | "in_progress",
  "confidence": 0.0
}

RULES:
- The summary must mention the concrete outcome or the current blocker
- Include specific details from the thread (error messages, numbers, decisions)
- "resolved" only when the thread itself confirms completion
- "in_progress" when work is actively happening but not finished
- confidence is your 0.0-1.0 certainty in the status call"#;

const TECHNICAL_ISSUE_PREAMBLE: &str = "You are summarizing a Slack thread about a technical issue (bug, outage, error, or performance problem).\n\
Capture: what broke, the impact, what was tried, and whether it is fixed.";

const QUESTION_ANSWER_PREAMBLE: &str = "You are summarizing a Slack thread where someone asked a question.\n\
Capture: the question, the answer given (if any), and whether the asker was satisfied.";

const DECISION_DISCUSSION_PREAMBLE: &str = "You are summarizing a Slack thread discussing a decision between options.\n\
Capture: the options considered, arguments raised, and the decision made (if any).";

const STATUS_UPDATE_PREAMBLE: &str = "You are summarizing a Slack thread carrying a progress report or announcement.\n\
Capture: what was announced or reported and any follow-ups requested.";

/// Category-specific summary instruction. `CasualChat` has no template:
/// casual threads are terminal and never reach summarization.
pub fn summary_instruction(category: Category) -> Option<String> {
    let preamble = match category {
        Category::TechnicalIssue => TECHNICAL_ISSUE_PREAMBLE,
        Category::QuestionAnswer => QUESTION_ANSWER_PREAMBLE,
        Category::DecisionDiscussion => DECISION_DISCUSSION_PREAMBLE,
        Category::StatusUpdate => STATUS_UPDATE_PREAMBLE,
        Category::CasualChat => return None,
    };
    Some(format!("{preamble}\n\n{SUMMARY_CONTRACT}"))
}

/// Task-extraction instruction: unresolved actionable items only, ADF bodies.
pub const TASK_EXTRACTION_PROMPT: &str = r#"You are analyzing Slack conversations to extract actionable tasks that need to be completed.
Your job: Identify unresolved action items or bugs from the conversation and extract clear task information for Jira tickets.
Return ONLY valid JSON (no markdown, no preamble):
{
  "tasks": [
    {
      "summary": "Clear, specific summary describing what needs to be done (5-10 words)",
      "description": {
        "type": "doc",
        "version": 1,
        "content": []
      }
    }
  ]
}
The description field must be in Atlassian Document Format (ADF). Use these ADF node types:
- Paragraph: { "type": "paragraph", "content": [{ "type": "text", "text": "your text" }] }
- Bold text: { "type": "text", "text": "bold text", "marks": [{ "type": "strong" }] }
- Bullet list: { "type": "bulletList", "content": [{ "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "item" }] }] }] }
GUIDELINES:
Summary (Jira ticket headline):
- Be specific and actionable
- Start with a verb for tasks ("Fix...", "Add...", "Investigate...")
- Describe the problem for bugs ("Fix login timeout for EU users")
- Keep it concise: 5-10 words
Description (Jira ticket body in ADF format):
Structure the description with bold section headers:
- "Problem:" or "Need:" - What the issue or task is (always include)
- "Why it matters / Business impact:" - Why this needs to be done (always include)
- "Technical context from conversation:" - Error messages, systems involved, technical details
- "Who is affected:" - Which users/systems are impacted
- "Reproduction steps:" - Use a bullet list for step-by-step instructions
- "Workarounds mentioned:" - Temporary solutions discussed
- "Acceptance / Next steps for the ticket:" - Use a bullet list for action items
- "Relevant people mentioned:" - Names and their roles/contributions
Only include sections where you have actual information from the thread.
Separate sections with empty paragraphs for spacing.
RULES:
- Only extract tasks that are unresolved or need follow-up action
- Don't extract completed work or resolved issues
- Don't extract vague discussions without clear action items
- If the conversation is just Q&A that was resolved, return an empty tasks array
- Each task should be actionable with enough detail for developers
- Don't estimate effort, assign priority, or assign owners
- ONLY include information that exists in the conversation - do not invent technical details, metrics, or facts
- CRITICAL: description MUST be valid ADF with type, version, and content fields"#;
