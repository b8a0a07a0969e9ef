//! Integration tests for studyplan
//!
//! Drive the generation pipeline against a canned backend and commit the
//! chosen schedule into a JSON task store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use studyplan::config::Config;
use studyplan::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use studyplan::schedule::{
    GenerationContext, GenerationRequest, MergeError, MergePolicy, Schedule, SchedulePipeline, ScheduleSource, commit,
};
use studyplan::store::{JsonTaskStore, TaskStore};
use studyplan::{Category, Task};
use tempfile::TempDir;

/// Backend that always answers with the same text
struct CannedClient {
    body: String,
    calls: AtomicUsize,
}

impl CannedClient {
    fn new(body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            body: body.into(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for CannedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(request.system_prompt.contains("2025-03-10"));
        Ok(CompletionResponse::text(self.body.clone()))
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.schedule.prompts_dir = None;
    config
}

fn ctx() -> GenerationContext {
    GenerationContext::with_clock(DateTime::parse_from_rfc3339("2025-03-10T07:30:00+00:00").unwrap(), 3)
}

fn options_body() -> &'static str {
    r#"Here you go:
```json
{"scheduleOptions": [
  [
    {"title": "Morning gym", "startTime": "2025-03-10T07:00:00Z", "endTime": "2025-03-10T08:00:00Z", "priority": "medium", "category": "personal"},
    {"title": "Side project", "startTime": "2025-03-10T19:00:00Z", "endTime": "2025-03-10T21:00:00Z", "priority": "high", "category": "work"}
  ],
  [
    {"title": "Deep work block", "startTime": "2025-03-10T09:00:00Z", "endTime": "2025-03-10T12:00:00Z", "priority": "high", "category": "work"},
    {"title": "Evening run", "startTime": "2025-03-10T18:00:00Z", "endTime": "2025-03-10T19:00:00Z", "priority": "low", "category": "personal"}
  ]
]}
```"#
}

#[tokio::test]
async fn test_generate_select_and_commit_to_json_store() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("tasks.json");
    let mut store = JsonTaskStore::open(&path).unwrap();

    let client = CannedClient::new(options_body());
    let pipeline = SchedulePipeline::new(client.clone(), &config()).unwrap();

    let request = GenerationRequest::new("Morning gym, evening coding this week");
    let outcome = pipeline.generate(&request, &mut ctx()).await.unwrap();
    assert_eq!(outcome.source, ScheduleSource::Generated);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);

    let Schedule::Candidates(set) = outcome.schedule else {
        panic!("expected candidates");
    };
    assert_eq!(set.len(), 2);
    let chosen = set.select(1).unwrap();
    assert_eq!(chosen[0].title, "Deep work block");

    let report = commit(&mut store, chosen, MergePolicy::Allow).unwrap();
    assert_eq!(report.added, 2);
    assert!(report.overlaps.is_empty());

    // Reopen from disk
    let reopened = JsonTaskStore::open(&path).unwrap();
    let titles: Vec<String> = reopened.list().unwrap().into_iter().map(|t| t.title).collect();
    assert!(titles.contains(&"Deep work block".to_string()));
    assert!(titles.contains(&"Evening run".to_string()));
}

#[tokio::test]
async fn test_existing_tasks_reach_prompt_and_reject_policy_blocks_overlap() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut store = JsonTaskStore::open(temp_dir.path().join("tasks.json")).unwrap();
    let lecture = Task::new(
        "Algorithms lecture",
        "2025-03-10T09:30:00Z".parse().unwrap(),
        "2025-03-10T11:00:00Z".parse().unwrap(),
    )
    .with_category(Category::Study);
    store.create(lecture).unwrap();

    let client = CannedClient::new(options_body());
    let pipeline = SchedulePipeline::new(client, &config()).unwrap();
    let request =
        GenerationRequest::new("Fit coding around my lectures this week").with_existing(store.list().unwrap());

    let outcome = pipeline.generate(&request, &mut ctx()).await.unwrap();
    let Schedule::Candidates(set) = outcome.schedule else {
        panic!("expected candidates");
    };

    let chosen = set.select(1).unwrap();
    let result = commit(&mut store, chosen, MergePolicy::Reject);
    assert!(matches!(result, Err(MergeError::Rejected { count: 1 })));
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unusable_backend_output_still_yields_choices() {
    let client = CannedClient::new("I'm sorry, I can only help with recipes.");
    let pipeline = SchedulePipeline::new(client, &config()).unwrap();

    let outcome = pipeline
        .generate(&GenerationRequest::new("Weekend projects and chores"), &mut ctx())
        .await
        .unwrap();

    assert!(matches!(outcome.source, ScheduleSource::Fallback { .. }));
    let Schedule::Candidates(set) = outcome.schedule else {
        panic!("expected candidates");
    };
    assert_eq!(set.len(), 3);
    for candidate in set.iter() {
        assert!(!candidate.tasks.is_empty());
        assert!(candidate.tasks.iter().all(|t| t.start_time < t.end_time));
    }
}

#[tokio::test]
async fn test_bracketed_prose_before_json_is_skipped() {
    let body = r#"Here are [2] options (one lighter):
{"scheduleOptions": [
  [{"title": "Reading", "startTime": "2025-03-10T18:00:00Z", "endTime": "2025-03-10T19:00:00Z", "priority": "low", "category": "study"}],
  [{"title": "Lab prep", "startTime": "2025-03-10T15:00:00Z", "endTime": "2025-03-10T16:00:00Z", "priority": "medium", "category": "study"}]
]} [let me know]"#;
    let client = CannedClient::new(body);
    let pipeline = SchedulePipeline::new(client, &config()).unwrap();

    let outcome = pipeline
        .generate(&GenerationRequest::new("Evening reading and lab prep today"), &mut ctx())
        .await
        .unwrap();

    assert_eq!(outcome.source, ScheduleSource::Generated);
    let Schedule::Candidates(set) = outcome.schedule else {
        panic!("expected candidates");
    };
    assert_eq!(set.len(), 2);
}
