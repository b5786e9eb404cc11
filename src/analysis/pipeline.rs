//! Per-thread processing pipeline.
//!
//! Fixed step order: fetch messages -> resolve names -> classify ->
//! (casual chat: done) -> extract tasks -> create tickets -> summarize ->
//! post reply -> mark resolved. Task extraction is deliberately blocking:
//! a fault there stops the thread before summarization runs.
//!
//! Any fault is absorbed one level up, at the analyzer's thread loop —
//! a failed thread never takes its siblings or the workspace run down.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::classifier::Classifier;
use crate::analysis::summary::{build_resolved_summary, has_reaction};
use crate::analysis::types::{Category, MessageInfo, SummaryStatus, ThreadContext};
use crate::clients::jira::TicketRegistry;
use crate::clients::slack::{ChatClient, RESOLUTION_MARKER, ThreadRoot};
use crate::error::{AnalysisError, ChatError};
use crate::workspace::{Workspace, WorkspaceSettings};

/// Selection filter: analyze a thread iff it has strictly more replies
/// than the workspace threshold. Pure; no side effects.
pub fn should_process(root: &ThreadRoot, settings: &WorkspaceSettings) -> bool {
    root.reply_count > settings.thread_threshold
}

/// Per-workspace user id -> display name cache.
///
/// Built once at the start of a workspace run from the bulk user listing,
/// lazily extended while enriching messages. Owned by a single run; writes
/// are idempotent upserts, so duplicate resolution is wasted work, never a
/// correctness bug.
pub struct UserNameCache {
    names: HashMap<String, String>,
    lookups: u64,
}

impl UserNameCache {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names, lookups: 0 }
    }

    /// Resolve a user id, hitting the chat client at most once per id.
    pub async fn resolve(
        &mut self,
        chat: &dyn ChatClient,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<String, ChatError> {
        if let Some(name) = self.names.get(user_id) {
            return Ok(name.clone());
        }
        self.lookups += 1;
        let name = chat.resolve_user_name(user_id, workspace_id).await?;
        self.names.insert(user_id.to_string(), name.clone());
        Ok(name)
    }

    /// Number of underlying lookup calls made past the initial bulk load.
    pub fn lookup_count(&self) -> u64 {
        self.lookups
    }
}

/// What the pipeline did with one thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadOutcome {
    /// Classified as casual chat; no summary, no tickets, no marker.
    Skipped,
    /// Summary posted; tickets possibly created.
    Posted {
        status: SummaryStatus,
        tickets_created: usize,
    },
}

/// Runs the full pipeline for one thread.
pub struct ThreadProcessor {
    chat: Arc<dyn ChatClient>,
    classifier: Classifier,
    tickets: Arc<TicketRegistry>,
}

impl ThreadProcessor {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        classifier: Classifier,
        tickets: Arc<TicketRegistry>,
    ) -> Self {
        Self {
            chat,
            classifier,
            tickets,
        }
    }

    /// Process one selected thread.
    pub async fn process(
        &self,
        root: &ThreadRoot,
        channel_id: &str,
        workspace: &Workspace,
        cache: &mut UserNameCache,
    ) -> Result<ThreadOutcome, AnalysisError> {
        let context = self.build_context(root, channel_id, workspace, cache).await?;

        let categorization = self.classifier.classify(&context).await?;
        info!(
            thread_ts = %root.ts,
            category = categorization.category.label(),
            "Thread classified"
        );

        if categorization.category == Category::CasualChat {
            return Ok(ThreadOutcome::Skipped);
        }

        // Extraction runs before summarization and gates it: an extraction
        // fault stops this thread here.
        let task_set = self.classifier.extract_tasks(&context).await?;
        let tickets_created = task_set.tasks.len();
        for task in &task_set.tasks {
            self.tickets.create_issue(&workspace.id, task).await?;
        }

        let summary = self
            .classifier
            .summarize(categorization.category, &context, &categorization)
            .await?;

        let body = serde_json::to_value(build_resolved_summary(&summary))
            .unwrap_or_else(|_| serde_json::json!({"blocks": []}));
        self.chat
            .post_reply(channel_id, &root.ts, &workspace.id, &body, &summary.summary)
            .await?;

        if summary.status == SummaryStatus::Resolved && !has_reaction(root, RESOLUTION_MARKER) {
            self.chat
                .add_resolution_marker(channel_id, &root.ts, &workspace.id)
                .await?;
        }

        Ok(ThreadOutcome::Posted {
            status: summary.status,
            tickets_created,
        })
    }

    /// Fetch the thread's messages and enrich them with display names.
    async fn build_context(
        &self,
        root: &ThreadRoot,
        channel_id: &str,
        workspace: &Workspace,
        cache: &mut UserNameCache,
    ) -> Result<ThreadContext, AnalysisError> {
        let raw_messages = self
            .chat
            .list_messages(channel_id, &root.ts, &workspace.id)
            .await?;
        debug!(thread_ts = %root.ts, count = raw_messages.len(), "Fetched thread messages");

        let mut messages = Vec::with_capacity(raw_messages.len());
        for msg in raw_messages {
            let user_name = cache
                .resolve(self.chat.as_ref(), &msg.user, &workspace.id)
                .await?;
            messages.push(MessageInfo {
                user: msg.user,
                user_name,
                text: msg.text,
                timestamp: msg.ts,
            });
        }

        Ok(ThreadContext::from_root(root, messages))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::types::ExtractedTask;
    use crate::clients::jira::TicketClient;
    use crate::clients::slack::RawMessage;
    use crate::error::{ModelError, TicketError};
    use crate::llm::{ChatMessage, Completion, ModelClient};
    use crate::workspace::Workspace;

    /// Model stub that replays scripted completions in order.
    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<Completion, ModelError> {
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;
            Ok(Completion { content })
        }
    }

    #[derive(Default)]
    struct RecordingChat {
        replies: Mutex<Vec<String>>,
        markers: Mutex<Vec<String>>,
        name_lookups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn list_users(
            &self,
            _workspace_id: &str,
        ) -> Result<HashMap<String, String>, ChatError> {
            Ok(HashMap::from([("U1".to_string(), "Ada".to_string())]))
        }

        async fn list_thread_roots(
            &self,
            _channel_id: &str,
            _workspace_id: &str,
        ) -> Result<Vec<ThreadRoot>, ChatError> {
            Ok(vec![])
        }

        async fn list_messages(
            &self,
            _channel_id: &str,
            thread_ts: &str,
            _workspace_id: &str,
        ) -> Result<Vec<RawMessage>, ChatError> {
            Ok(vec![
                RawMessage {
                    ts: thread_ts.to_string(),
                    text: "root".into(),
                    user: "U1".into(),
                },
                RawMessage {
                    ts: "1.1".into(),
                    text: "reply".into(),
                    user: "U2".into(),
                },
            ])
        }

        async fn resolve_user_name(
            &self,
            user_id: &str,
            _workspace_id: &str,
        ) -> Result<String, ChatError> {
            self.name_lookups.lock().unwrap().push(user_id.to_string());
            Ok(format!("name-{user_id}"))
        }

        async fn post_reply(
            &self,
            _channel_id: &str,
            thread_ts: &str,
            _workspace_id: &str,
            _body: &serde_json::Value,
            _fallback_text: &str,
        ) -> Result<(), ChatError> {
            self.replies.lock().unwrap().push(thread_ts.to_string());
            Ok(())
        }

        async fn add_resolution_marker(
            &self,
            _channel_id: &str,
            thread_ts: &str,
            _workspace_id: &str,
        ) -> Result<(), ChatError> {
            self.markers.lock().unwrap().push(thread_ts.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTickets {
        created: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TicketClient for RecordingTickets {
        async fn create_issue(&self, task: &ExtractedTask) -> Result<String, TicketError> {
            self.created.lock().unwrap().push(task.summary.clone());
            Ok(format!("TW-{}", self.created.lock().unwrap().len()))
        }
    }

    fn workspace() -> Workspace {
        Workspace {
            id: "default".into(),
            channels: vec!["C1".into()],
            settings: WorkspaceSettings { thread_threshold: 2 },
        }
    }

    fn processor(
        model: ScriptedModel,
        chat: Arc<RecordingChat>,
        tickets: Arc<RecordingTickets>,
    ) -> ThreadProcessor {
        let registry = Arc::new(TicketRegistry::new(Some(
            tickets as Arc<dyn TicketClient>,
        )));
        ThreadProcessor::new(chat, Classifier::new(Arc::new(model)), registry)
    }

    const CLASSIFY_CASUAL: &str =
        r#"{"category": "casual_chat", "tone": "playful", "resolution": "not_applicable"}"#;
    const CLASSIFY_TECHNICAL: &str =
        r#"{"category": "technical_issue", "tone": "serious", "resolution": "resolved"}"#;
    const NO_TASKS: &str = r#"{"tasks": []}"#;
    const TWO_TASKS: &str = r#"{"tasks": [
        {"summary": "Fix login timeout", "description": {"type": "doc", "version": 1, "content": []}},
        {"summary": "Add retry to session refresh", "description": {"type": "doc", "version": 1, "content": []}}
    ]}"#;
    const SUMMARY_RESOLVED: &str =
        r#"{"summary": "Fixed by restarting the pods.", "status": "resolved", "confidence": 0.9}"#;
    const SUMMARY_UNRESOLVED: &str =
        r#"{"summary": "Still failing in staging.", "status": "unresolved", "confidence": 0.7}"#;

    #[tokio::test]
    async fn casual_chat_produces_no_side_effects() {
        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        let proc = processor(ScriptedModel::new(&[CLASSIFY_CASUAL]), chat.clone(), tickets.clone());

        let mut cache = UserNameCache::new(HashMap::new());
        let outcome = proc
            .process(&root_with_replies(3), "C1", &workspace(), &mut cache)
            .await
            .unwrap();

        assert_eq!(outcome, ThreadOutcome::Skipped);
        assert!(chat.replies.lock().unwrap().is_empty());
        assert!(chat.markers.lock().unwrap().is_empty());
        assert!(tickets.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolved_thread_posts_reply_and_marker() {
        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        let proc = processor(
            ScriptedModel::new(&[CLASSIFY_TECHNICAL, NO_TASKS, SUMMARY_RESOLVED]),
            chat.clone(),
            tickets.clone(),
        );

        let mut cache = UserNameCache::new(HashMap::new());
        let outcome = proc
            .process(&root_with_replies(3), "C1", &workspace(), &mut cache)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ThreadOutcome::Posted {
                status: SummaryStatus::Resolved,
                tickets_created: 0,
            }
        );
        assert_eq!(chat.replies.lock().unwrap().len(), 1);
        assert_eq!(chat.markers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn already_marked_thread_is_not_marked_again() {
        use crate::clients::slack::Reaction;

        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        let proc = processor(
            ScriptedModel::new(&[CLASSIFY_TECHNICAL, NO_TASKS, SUMMARY_RESOLVED]),
            chat.clone(),
            tickets.clone(),
        );

        let mut root = root_with_replies(3);
        root.reactions.push(Reaction {
            name: RESOLUTION_MARKER.into(),
            users: vec!["U1".into()],
            count: 1,
        });

        let mut cache = UserNameCache::new(HashMap::new());
        proc.process(&root, "C1", &workspace(), &mut cache)
            .await
            .unwrap();

        assert_eq!(chat.replies.lock().unwrap().len(), 1);
        assert!(chat.markers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolved_thread_posts_reply_without_marker() {
        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        let proc = processor(
            ScriptedModel::new(&[CLASSIFY_TECHNICAL, NO_TASKS, SUMMARY_UNRESOLVED]),
            chat.clone(),
            tickets.clone(),
        );

        let mut cache = UserNameCache::new(HashMap::new());
        proc.process(&root_with_replies(3), "C1", &workspace(), &mut cache)
            .await
            .unwrap();

        assert_eq!(chat.replies.lock().unwrap().len(), 1);
        assert!(chat.markers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_extracted_task_becomes_a_ticket() {
        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        let proc = processor(
            ScriptedModel::new(&[CLASSIFY_TECHNICAL, TWO_TASKS, SUMMARY_UNRESOLVED]),
            chat.clone(),
            tickets.clone(),
        );

        let mut cache = UserNameCache::new(HashMap::new());
        let outcome = proc
            .process(&root_with_replies(3), "C1", &workspace(), &mut cache)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ThreadOutcome::Posted {
                status: SummaryStatus::Unresolved,
                tickets_created: 2,
            }
        );
        let created = tickets.created.lock().unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0], "Fix login timeout");
    }

    #[tokio::test]
    async fn extraction_failure_blocks_summarization() {
        let chat = Arc::new(RecordingChat::default());
        let tickets = Arc::new(RecordingTickets::default());
        // Second scripted response is not valid task JSON.
        let proc = processor(
            ScriptedModel::new(&[CLASSIFY_TECHNICAL, "not json"]),
            chat.clone(),
            tickets.clone(),
        );

        let mut cache = UserNameCache::new(HashMap::new());
        let result = proc
            .process(&root_with_replies(3), "C1", &workspace(), &mut cache)
            .await;

        assert!(result.is_err());
        assert!(chat.replies.lock().unwrap().is_empty());
        assert!(tickets.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn name_cache_hits_client_once_per_unknown_user() {
        let chat = RecordingChat::default();
        let mut cache = UserNameCache::new(HashMap::from([(
            "U1".to_string(),
            "Ada".to_string(),
        )]));

        assert_eq!(cache.resolve(&chat, "U1", "default").await.unwrap(), "Ada");
        assert_eq!(
            cache.resolve(&chat, "U2", "default").await.unwrap(),
            "name-U2"
        );
        assert_eq!(
            cache.resolve(&chat, "U2", "default").await.unwrap(),
            "name-U2"
        );
        assert_eq!(cache.lookup_count(), 1);
        assert_eq!(chat.name_lookups.lock().unwrap().len(), 1);
    }

    fn root_with_replies(reply_count: u32) -> ThreadRoot {
        ThreadRoot {
            ts: "1.0".into(),
            text: "root".into(),
            user: "U1".into(),
            reply_count,
            reply_users_count: 1,
            reply_users: vec!["U1".into()],
            reactions: vec![],
            is_locked: false,
        }
    }

    #[test]
    fn selection_is_strictly_greater_than_threshold() {
        let settings = WorkspaceSettings { thread_threshold: 2 };
        assert!(!should_process(&root_with_replies(1), &settings));
        assert!(!should_process(&root_with_replies(2), &settings));
        assert!(should_process(&root_with_replies(3), &settings));
    }

    #[test]
    fn zero_threshold_still_excludes_zero_replies() {
        let settings = WorkspaceSettings { thread_threshold: 0 };
        assert!(!should_process(&root_with_replies(0), &settings));
        assert!(should_process(&root_with_replies(1), &settings));
    }
}
