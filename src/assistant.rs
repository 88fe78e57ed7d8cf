//! The chat loop: question in, traced turn out.
//!
//! [`Assistant::submit`] runs one interaction end to end:
//!
//! 1. keyword-match the question against the knowledge base;
//! 2. build the message sequence from the system prompt, related content
//!    and the session's history;
//! 3. call the completion client (fail-soft, see [`crate::completion`]);
//! 4. record the exchange with the trace logger;
//! 5. append a [`Turn`] to the session.
//!
//! Step 4 is the only step allowed to fail. When it does, the session is
//! left untouched.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::completion::{self, CompletionClient};
use crate::knowledge::{find_relevant_content, KnowledgeBase};
use crate::models::{Turn, Vote};
use crate::prompt::build_messages;
use crate::session::Session;
use crate::trace::{PromptTrace, TraceLogger, TraceMetadata};

pub struct Assistant {
    knowledge: Arc<KnowledgeBase>,
    completion: Arc<dyn CompletionClient>,
    tracer: Arc<dyn TraceLogger>,
    system_prompt: String,
}

impl Assistant {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        completion: Arc<dyn CompletionClient>,
        tracer: Arc<dyn TraceLogger>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            knowledge,
            completion,
            tracer,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Answer `question` within `session`.
    ///
    /// Returns `Ok(None)` without side effects for blank input. A degraded
    /// completion still produces a turn whose answer is the error text.
    pub async fn submit<'s>(
        &self,
        session: &'s mut Session,
        question: &str,
    ) -> Result<Option<&'s Turn>> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        let related = find_relevant_content(question, &self.knowledge);
        tracing::debug!(
            related_chars = related.len(),
            history_turns = session.len(),
            "built prompt context"
        );

        let messages = build_messages(&self.system_prompt, question, &related, session.turns());
        let generation = completion::generate(self.completion.as_ref(), &messages).await;

        let trace = PromptTrace {
            prompt: question.to_string(),
            output: generation.completion.text().to_string(),
            duration: generation.duration,
            metadata: TraceMetadata {
                model: self.completion.model_name().to_string(),
                system_prompt: self.system_prompt.clone(),
            },
        };
        let trace_id = self.tracer.log_prompt(&trace).await?;

        tracing::info!(
            trace_id = %trace_id,
            degraded = generation.completion.is_degraded(),
            duration_ms = generation.duration.as_millis() as u64,
            "answered question"
        );

        session.push(Turn {
            question: question.to_string(),
            answer: generation.completion.into_text(),
            trace_id,
        });
        Ok(session.turns().last())
    }

    /// Record `vote` against the trace of turn `index`. The session is only
    /// read.
    pub async fn feedback(&self, session: &Session, index: usize, vote: Vote) -> Result<()> {
        let turn = session
            .turn(index)
            .ok_or_else(|| anyhow!("turn {} not found", index))?;
        self.tracer.log_feedback(&turn.trace_id, vote.score()).await?;
        tracing::info!(trace_id = %turn.trace_id, score = vote.score(), "logged feedback");
        Ok(())
    }

    pub fn clear(&self, session: &mut Session) {
        session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, KnowledgeDocument, Role, TraceId};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCompletion {
        fail: bool,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if self.fail {
                Err(anyhow!("service unavailable"))
            } else {
                Ok(format!("answer #{}", self.seen.lock().unwrap().len()))
            }
        }
    }

    #[derive(Default)]
    struct RecordingTracer {
        fail: bool,
        prompts: Mutex<Vec<PromptTrace>>,
        feedback: Mutex<Vec<(TraceId, f64)>>,
    }

    #[async_trait]
    impl TraceLogger for RecordingTracer {
        async fn log_prompt(&self, trace: &PromptTrace) -> Result<TraceId> {
            if self.fail {
                return Err(anyhow!("trace service down"));
            }
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(trace.clone());
            Ok(TraceId(format!("trace-{}", prompts.len())))
        }

        async fn log_feedback(&self, trace_id: &TraceId, score: f64) -> Result<()> {
            self.feedback.lock().unwrap().push((trace_id.clone(), score));
            Ok(())
        }
    }

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::from_documents(vec![KnowledgeDocument {
            identifier: "panels.json".to_string(),
            content: "Panels are written in Python.".to_string(),
        }]))
    }

    fn assistant(
        completion: Arc<RecordingCompletion>,
        tracer: Arc<RecordingTracer>,
    ) -> Assistant {
        Assistant::new(knowledge(), completion, tracer, "be helpful")
    }

    #[tokio::test]
    async fn test_submit_appends_one_turn() {
        let completion = Arc::new(RecordingCompletion::default());
        let tracer = Arc::new(RecordingTracer::default());
        let assistant = assistant(completion.clone(), tracer.clone());
        let mut session = Session::new();

        let turn = assistant
            .submit(&mut session, "how do panels work")
            .await
            .unwrap()
            .cloned()
            .unwrap();

        assert_eq!(session.len(), 1);
        assert_eq!(turn.question, "how do panels work");
        assert_eq!(turn.answer, "answer #1");
        assert_eq!(turn.trace_id, TraceId("trace-1".to_string()));

        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen[0][2].role, Role::Assistant);
        assert_eq!(seen[0][2].content, "Panels are written in Python.");

        let prompts = tracer.prompts.lock().unwrap();
        assert_eq!(prompts[0].prompt, "how do panels work");
        assert_eq!(prompts[0].output, "answer #1");
        assert_eq!(prompts[0].metadata.model, "test-model");
        assert_eq!(prompts[0].metadata.system_prompt, "be helpful");
    }

    #[tokio::test]
    async fn test_history_is_replayed() {
        let completion = Arc::new(RecordingCompletion::default());
        let tracer = Arc::new(RecordingTracer::default());
        let assistant = assistant(completion.clone(), tracer);
        let mut session = Session::new();

        assistant.submit(&mut session, "first").await.unwrap();
        assistant.submit(&mut session, "second").await.unwrap();

        let seen = completion.seen.lock().unwrap();
        let contents: Vec<&str> = seen[1].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["be helpful", "second", "", "first", "answer #1", "second"]
        );
    }

    #[tokio::test]
    async fn test_failed_completion_still_appends_turn() {
        let completion = Arc::new(RecordingCompletion {
            fail: true,
            ..Default::default()
        });
        let tracer = Arc::new(RecordingTracer::default());
        let assistant = assistant(completion, tracer.clone());
        let mut session = Session::new();

        assistant.submit(&mut session, "hello").await.unwrap();

        assert_eq!(session.len(), 1);
        assert!(session.turns()[0].answer.contains("service unavailable"));
        assert!(tracer.prompts.lock().unwrap()[0]
            .output
            .starts_with("An error occurred:"));
    }

    #[tokio::test]
    async fn test_trace_failure_propagates_without_turn() {
        let completion = Arc::new(RecordingCompletion::default());
        let tracer = Arc::new(RecordingTracer {
            fail: true,
            ..Default::default()
        });
        let assistant = assistant(completion, tracer);
        let mut session = Session::new();

        assert!(assistant.submit(&mut session, "hello").await.is_err());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let completion = Arc::new(RecordingCompletion::default());
        let tracer = Arc::new(RecordingTracer::default());
        let assistant = assistant(completion.clone(), tracer);
        let mut session = Session::new();

        let result = assistant.submit(&mut session, "  \n").await.unwrap();
        assert!(result.is_none());
        assert!(session.is_empty());
        assert!(completion.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_scores_and_keeps_conversation() {
        let completion = Arc::new(RecordingCompletion::default());
        let tracer = Arc::new(RecordingTracer::default());
        let assistant = assistant(completion, tracer.clone());
        let mut session = Session::new();
        assistant.submit(&mut session, "one").await.unwrap();
        assistant.submit(&mut session, "two").await.unwrap();
        let before = session.turns().to_vec();

        assistant.feedback(&session, 1, Vote::Up).await.unwrap();
        assistant.feedback(&session, 0, Vote::Down).await.unwrap();

        assert_eq!(session.turns(), before.as_slice());
        let feedback = tracer.feedback.lock().unwrap();
        assert_eq!(
            *feedback,
            vec![
                (TraceId("trace-2".to_string()), 1.0),
                (TraceId("trace-1".to_string()), 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_feedback_on_unknown_turn_fails() {
        let assistant = assistant(
            Arc::new(RecordingCompletion::default()),
            Arc::new(RecordingTracer::default()),
        );
        let session = Session::new();
        let err = assistant.feedback(&session, 3, Vote::Up).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_clear() {
        let assistant = assistant(
            Arc::new(RecordingCompletion::default()),
            Arc::new(RecordingTracer::default()),
        );
        let mut session = Session::new();
        assistant.submit(&mut session, "a").await.unwrap();
        assistant.submit(&mut session, "b").await.unwrap();
        assistant.clear(&mut session);
        assert!(session.is_empty());
    }
}
