//! Classification engine — classify, summarize, extract tasks.
//!
//! Three model calls, each a strict JSON contract: the response body must
//! parse into the typed schema or the call fails with a
//! [`ClassificationError`]. Failures are never retried here; they propagate
//! to the thread pipeline, which absorbs them per thread.
//!
//! Classification and summarization are split on purpose: irrelevant
//! (casual) threads skip summarization entirely, and the classification
//! picks which of the four summary templates the second call uses.

use std::sync::Arc;

use tracing::debug;

use crate::analysis::prompts::{
    CATEGORIZING_PROMPT, TASK_EXTRACTION_PROMPT, summary_instruction,
};
use crate::analysis::types::{
    Categorization, Category, TaskSet, ThreadContext, ThreadSummary,
};
use crate::error::ClassificationError;
use crate::llm::{ChatMessage, ModelClient};

pub struct Classifier {
    model: Arc<dyn ModelClient>,
}

impl Classifier {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Classify a thread across the three axes.
    pub async fn classify(
        &self,
        context: &ThreadContext,
    ) -> Result<Categorization, ClassificationError> {
        let user_prompt = format!(
            "Classify this Slack thread:\nThread data: {}",
            serialize_context(context)
        );
        let content = self
            .complete("classify", CATEGORIZING_PROMPT, user_prompt)
            .await?;

        let categorization: Categorization = parse_contract("classify", &content)?;
        debug!(category = categorization.category.label(), "Thread classified");
        Ok(categorization)
    }

    /// Summarize a classified thread using its category's template.
    pub async fn summarize(
        &self,
        category: Category,
        context: &ThreadContext,
        categorization: &Categorization,
    ) -> Result<ThreadSummary, ClassificationError> {
        let instruction = summary_instruction(category)
            .ok_or_else(|| ClassificationError::NotSummarizable(category.label().to_string()))?;

        let user_prompt = format!(
            "Analyze this thread:\nThread Data: {}\nFilter Results: {}",
            serialize_context(context),
            serde_json::to_string_pretty(categorization).unwrap_or_default(),
        );
        let content = self.complete("summarize", &instruction, user_prompt).await?;

        parse_contract("summarize", &content)
    }

    /// Extract actionable tasks from a thread. May legitimately be empty.
    pub async fn extract_tasks(
        &self,
        context: &ThreadContext,
    ) -> Result<TaskSet, ClassificationError> {
        let user_prompt = format!(
            "Analyze this thread:\nThread Data: {}",
            serialize_context(context)
        );
        let content = self
            .complete("extract_tasks", TASK_EXTRACTION_PROMPT, user_prompt)
            .await?;

        let task_set: TaskSet = parse_contract("extract_tasks", &content)?;
        validate_task_set(&task_set)?;
        Ok(task_set)
    }

    async fn complete(
        &self,
        stage: &'static str,
        instruction: &str,
        user_prompt: String,
    ) -> Result<String, ClassificationError> {
        let messages = vec![ChatMessage::system(instruction), ChatMessage::user(user_prompt)];
        let completion = self
            .model
            .complete(&messages)
            .await
            .map_err(|source| ClassificationError::ModelCall { stage, source })?;
        Ok(completion.content)
    }
}

fn serialize_context(context: &ThreadContext) -> String {
    serde_json::to_string_pretty(context).unwrap_or_default()
}

/// Parse a model response into a typed contract, tolerating markdown
/// wrapping around the JSON object.
fn parse_contract<T: serde::de::DeserializeOwned>(
    stage: &'static str,
    raw: &str,
) -> Result<T, ClassificationError> {
    let json_str = extract_json_object(raw);
    serde_json::from_str(&json_str).map_err(|e| ClassificationError::Contract {
        stage,
        reason: e.to_string(),
    })
}

/// Every extracted task needs a non-empty summary and an object-typed
/// description document.
fn validate_task_set(task_set: &TaskSet) -> Result<(), ClassificationError> {
    for task in &task_set.tasks {
        if task.summary.trim().is_empty() {
            return Err(ClassificationError::Contract {
                stage: "extract_tasks",
                reason: "task with empty summary".to_string(),
            });
        }
        if !task.description.is_object() {
            return Err(ClassificationError::Contract {
                stage: "extract_tasks",
                reason: "task description is not a document object".to_string(),
            });
        }
    }
    Ok(())
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
