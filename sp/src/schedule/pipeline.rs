//! Schedule generation pipeline
//!
//! Prompt interpreter -> backend -> parser -> normalizer, with the fallback
//! synthesizer taking over whenever the backend path yields nothing usable.
//! The distribution repair pass runs on whichever result comes out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::adapter::ScheduleBackend;
use super::error::GenerationError;
use super::fallback::FallbackSynthesizer;
use super::normalize::normalize_all;
use super::parser::{ParsedSchedule, ResponseParser};
use super::prompt::{GenerationRequest, Horizon, PromptInterpreter};
use super::repair::repair_distribution;
use super::selection::CandidateSet;
use super::GenerationContext;
use crate::config::Config;
use crate::domain::Task;
use crate::llm::{LlmClient, LlmError};

/// What a generation produced
#[derive(Debug)]
pub enum Schedule {
    /// One task list, ready to commit
    Single(Vec<Task>),
    /// Alternatives; the caller selects one or dismisses all
    Candidates(CandidateSet),
}

/// Where the schedule came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSource {
    Generated,
    /// `transient` is set when the backend failure is worth retrying later
    Fallback { reason: String, transient: bool },
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub schedule: Schedule,
    pub source: ScheduleSource,
    pub horizon: Horizon,
    /// Tasks re-categorized by the repair pass
    pub repaired: usize,
    /// Message for the user
    pub message: String,
}

/// Releases the in-flight slot on drop
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one generation request at a time
pub struct SchedulePipeline {
    interpreter: PromptInterpreter,
    backend: ScheduleBackend,
    parser: ResponseParser,
    fallback: FallbackSynthesizer,
    in_flight: AtomicBool,
}

impl SchedulePipeline {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config) -> Result<Self, GenerationError> {
        Ok(Self {
            interpreter: PromptInterpreter::new(&config.schedule)?,
            backend: ScheduleBackend::new(llm, &config.llm),
            parser: ResponseParser::new(),
            fallback: FallbackSynthesizer::new(&config.schedule),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Generate a schedule for a request
    ///
    /// Only a rejected prompt or a request already in flight is an error;
    /// every backend or parse failure produces fallback candidates.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
    ) -> Result<GenerationOutcome, GenerationError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(GenerationError::Busy)?;
        debug!(options = request.generate_options, "generate: called");

        let envelope = self.interpreter.interpret(request, ctx)?;
        let horizon = envelope.horizon;

        let generated = match self.backend.fetch(&envelope).await {
            Ok(text) => self.materialize(&text, request.generate_options, ctx).map_err(|r| (r, false)),
            Err(e) => Err((backend_failure_reason(&e), e.is_retryable())),
        };

        let weekend_prompt = request.prompt.to_lowercase().contains("weekend");
        let offset = ctx.offset();
        let (schedule, source) = match generated {
            Ok(schedule) => (schedule, ScheduleSource::Generated),
            Err((reason, transient)) => {
                warn!(%reason, transient, "Falling back to locally generated schedules");
                let schedules = self.fallback.synthesize(&request.prompt, ctx);
                (
                    Schedule::Candidates(CandidateSet::from_schedules(schedules)),
                    ScheduleSource::Fallback { reason, transient },
                )
            }
        };

        let (schedule, repaired) = match schedule {
            Schedule::Single(mut tasks) => {
                let repaired = repair_distribution(&mut tasks, weekend_prompt, offset);
                (Schedule::Single(tasks), repaired)
            }
            Schedule::Candidates(set) => {
                let mut repaired = 0;
                let schedules: Vec<Vec<Task>> = set
                    .iter()
                    .map(|c| {
                        let mut tasks = c.tasks.clone();
                        repaired += repair_distribution(&mut tasks, weekend_prompt, offset);
                        tasks
                    })
                    .collect();
                (Schedule::Candidates(CandidateSet::from_schedules(schedules)), repaired)
            }
        };

        let message = outcome_message(&schedule, &source, horizon);
        info!(%horizon, ?source, repaired, "Generation finished");
        Ok(GenerationOutcome {
            schedule,
            source,
            horizon,
            repaired,
            message,
        })
    }

    /// Parse and normalize backend text; `Err` carries the fallback reason
    fn materialize(&self, text: &str, generate_options: bool, ctx: &GenerationContext) -> Result<Schedule, String> {
        let offset = ctx.offset();
        match self.parser.parse(text, generate_options) {
            ParsedSchedule::Single(raws) => {
                let tasks = normalize_all(&raws, offset);
                if tasks.is_empty() {
                    return Err("response contained no usable tasks".to_string());
                }
                Ok(Schedule::Single(tasks))
            }
            ParsedSchedule::Multi(options) => {
                let mut schedules = Vec::with_capacity(options.len());
                for (i, raws) in options.iter().enumerate() {
                    let tasks = normalize_all(raws, offset);
                    if tasks.is_empty() {
                        return Err(format!("schedule option {} contained no usable tasks", i + 1));
                    }
                    schedules.push(tasks);
                }
                Ok(Schedule::Candidates(CandidateSet::from_schedules(schedules)))
            }
            ParsedSchedule::Unparseable(reason) => Err(format!("could not parse response: {}", reason)),
        }
    }
}

fn backend_failure_reason(e: &LlmError) -> String {
    if e.is_rate_limit() {
        format!("schedule service is rate limiting requests ({})", e)
    } else if e.is_retryable() {
        format!("schedule service temporarily unavailable: {}", e)
    } else {
        format!("schedule service error: {}", e)
    }
}

fn outcome_message(schedule: &Schedule, source: &ScheduleSource, horizon: Horizon) -> String {
    match (source, schedule) {
        (ScheduleSource::Fallback { transient, .. }, _) => {
            let mut message = format!(
                "The schedule service was unavailable, so here are some locally generated {} schedule options. Choose the one that works best for you!",
                horizon
            );
            if *transient {
                message.push_str(" The service should be back shortly if you want to try again.");
            }
            message
        }
        (ScheduleSource::Generated, Schedule::Single(tasks)) => {
            format!("Your {} schedule has been created with {} tasks.", horizon, tasks.len())
        }
        (ScheduleSource::Generated, Schedule::Candidates(_)) => format!(
            "Here are some {} schedule options based on your request. Choose the one that works best for you!",
            horizon
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionRequest, CompletionResponse};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashSet;
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::default();
        config.schedule.prompts_dir = None;
        config
    }

    fn ctx() -> GenerationContext {
        GenerationContext::with_clock(DateTime::parse_from_rfc3339("2025-03-10T08:00:00+00:00").unwrap(), 17)
    }

    fn task_json(title: &str, day: u32, hour: u32, category: &str) -> String {
        format!(
            r#"{{"title":"{}","startTime":"2025-03-{:02}T{:02}:00:00Z","endTime":"2025-03-{:02}T{:02}:00:00Z","priority":"high","category":"{}"}}"#,
            title,
            day,
            hour,
            day,
            hour + 1,
            category
        )
    }

    fn pipeline(mock: &Arc<MockLlmClient>) -> SchedulePipeline {
        SchedulePipeline::new(mock.clone(), &config()).unwrap()
    }

    #[tokio::test]
    async fn test_short_prompt_never_calls_backend() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let pipeline = pipeline(&mock);

        let result = pipeline.generate(&GenerationRequest::new("gym"), &mut ctx()).await;

        assert!(matches!(result, Err(GenerationError::PromptTooShort { .. })));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_json_response_falls_back_to_three_candidates() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text(
            "Sorry, I can't make a schedule right now.",
        )]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Plan a week with gym and coding"), &mut ctx())
            .await
            .unwrap();

        assert!(matches!(outcome.source, ScheduleSource::Fallback { .. }));
        let Schedule::Candidates(set) = outcome.schedule else {
            panic!("expected candidates");
        };
        assert_eq!(set.len(), 3);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_single_mode_falls_back_to_candidates_too() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Err(LlmError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Study plan for today please").single(), &mut ctx())
            .await
            .unwrap();

        assert_eq!(outcome.horizon, Horizon::Daily);
        assert!(matches!(outcome.schedule, Schedule::Candidates(ref set) if set.len() == 3));
        assert!(outcome.message.contains("locally generated"));
    }

    #[tokio::test]
    async fn test_transient_backend_failure_is_flagged() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Err(LlmError::RateLimited {
            retry_after: Duration::from_secs(30),
        })]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Plan a week with gym and coding"), &mut ctx())
            .await
            .unwrap();

        let ScheduleSource::Fallback { reason, transient } = &outcome.source else {
            panic!("expected fallback");
        };
        assert!(*transient);
        assert!(reason.contains("rate limiting"));
        assert!(outcome.message.contains("try again"));
    }

    #[tokio::test]
    async fn test_permanent_backend_failure_is_not_transient() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Err(LlmError::ApiError {
            status: 400,
            message: "bad request".to_string(),
        })]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Plan a week with gym and coding"), &mut ctx())
            .await
            .unwrap();

        assert!(matches!(
            outcome.source,
            ScheduleSource::Fallback { ref reason, transient: false } if reason.starts_with("schedule service error")
        ));
        assert!(!outcome.message.contains("try again"));
    }

    #[tokio::test]
    async fn test_single_mode_flat_array() {
        let body = format!(
            "```json\n[{}, {}, {}]\n```",
            task_json("Gym", 10, 7, "personal"),
            task_json("Coding", 10, 18, "work"),
            task_json("Calculus", 11, 9, "study")
        );
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text(body)]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Gym, coding and calculus this week").single(), &mut ctx())
            .await
            .unwrap();

        assert_eq!(outcome.source, ScheduleSource::Generated);
        let Schedule::Single(tasks) = outcome.schedule else {
            panic!("expected a single schedule");
        };
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].title, "Gym");
        assert_eq!(outcome.repaired, 0);
    }

    #[tokio::test]
    async fn test_multi_mode_keeps_payload_candidate_count_with_unique_ids() {
        let option = |offset: u32| {
            format!(
                "[{}, {}]",
                task_json("Gym", 10, 7 + offset, "personal"),
                task_json("Coding", 10, 12 + offset, "work")
            )
        };
        let body = format!(r#"{{"scheduleOptions": [{}, {}]}}"#, option(0), option(1));
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text(body)]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Plan a week with gym and coding"), &mut ctx())
            .await
            .unwrap();

        let Schedule::Candidates(set) = outcome.schedule else {
            panic!("expected candidates");
        };
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).unwrap().label, "Balanced");

        let ids: Vec<_> = set.iter().flat_map(|c| c.tasks.iter().map(|t| t.id.clone())).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[tokio::test]
    async fn test_generated_monolithic_day_is_repaired() {
        let body = format!(
            "[{}, {}, {}]",
            task_json("Chapter 1", 10, 9, "study"),
            task_json("Chapter 2", 10, 12, "study"),
            task_json("Chapter 3", 10, 15, "study")
        );
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text(body)]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Read my textbook this week").single(), &mut ctx())
            .await
            .unwrap();

        assert_eq!(outcome.repaired, 1);
        let Schedule::Single(tasks) = outcome.schedule else {
            panic!("expected a single schedule");
        };
        let categories: HashSet<Category> = tasks.iter().map(|t| t.category).collect();
        assert!(categories.len() > 1);
    }

    #[tokio::test]
    async fn test_options_with_only_invalid_tasks_fall_back() {
        let body = r#"{"scheduleOptions": [[{"title": "No times"}]]}"#;
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::text(body)]));
        let pipeline = pipeline(&mock);

        let outcome = pipeline
            .generate(&GenerationRequest::new("Plan a week with gym and coding"), &mut ctx())
            .await
            .unwrap();

        assert!(matches!(
            outcome.source,
            ScheduleSource::Fallback { ref reason, transient: false } if reason.contains("no usable")
        ));
    }

    /// Client that answers after a delay, to hold the in-flight slot
    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(CompletionResponse::text("not json"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_generate_is_busy() {
        let pipeline = SchedulePipeline::new(Arc::new(SlowClient), &config()).unwrap();
        let request = GenerationRequest::new("Plan a week with gym and coding");
        let (mut ctx_a, mut ctx_b) = (ctx(), ctx());

        let (first, second) = tokio::join!(
            pipeline.generate(&request, &mut ctx_a),
            pipeline.generate(&request, &mut ctx_b)
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(GenerationError::Busy)));

        // slot released once the first request finished
        assert!(pipeline.generate(&request, &mut ctx()).await.is_ok());
    }
}
