//! Prompt interpretation
//!
//! Validates the raw prompt, picks the planning horizon, and renders the
//! instruction envelope sent to the generative backend.

use std::path::{Path, PathBuf};

use chrono::{Days, FixedOffset, NaiveDate};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::GenerationContext;
use super::embedded::{self, SCHEDULE_SYSTEM_NAME, SCHEDULE_USER_NAME, TEMPLATE_NAMES};
use super::error::GenerationError;
use crate::config::ScheduleConfig;
use crate::domain::Task;

/// How far ahead a schedule plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Daily,
    #[default]
    Weekly,
}

impl Horizon {
    /// Keyword scan: "daily" or "today" selects a daily plan
    pub fn detect(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        if lower.contains("daily") || lower.contains("today") {
            Self::Daily
        } else {
            Self::Weekly
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            _ => Err(format!("Unknown horizon: {}. Use: daily or weekly", s)),
        }
    }
}

/// Inclusive range of local calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A schedule generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Raw user prompt
    pub prompt: String,
    /// Explicit horizon; detected from the prompt when `None`
    pub horizon: Option<Horizon>,
    /// Tasks already in the store, sent as context and never modified
    pub existing: Vec<Task>,
    /// Ask for several candidate schedules instead of one
    pub generate_options: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            horizon: None,
            existing: Vec::new(),
            generate_options: true,
        }
    }

    pub fn with_horizon(mut self, horizon: Option<Horizon>) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_existing(mut self, existing: Vec<Task>) -> Self {
        self.existing = existing;
        self
    }

    pub fn single(mut self) -> Self {
        self.generate_options = false;
        self
    }
}

/// The rendered request for the generative backend
#[derive(Debug, Clone)]
pub struct InstructionEnvelope {
    pub system_prompt: String,
    pub user_prompt: String,
    pub nonce: Uuid,
    pub horizon: Horizon,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
struct ExistingTaskView {
    title: String,
    category: String,
    start: String,
    end: String,
}

#[derive(Debug, Serialize)]
struct SystemTemplateContext {
    today: String,
    range_start: String,
    range_end: String,
    utc_offset: String,
    existing: Vec<ExistingTaskView>,
    existing_omitted: usize,
    generate_options: bool,
    option_count: usize,
}

#[derive(Debug, Serialize)]
struct UserTemplateContext<'a> {
    horizon: String,
    prompt: &'a str,
    nonce: String,
}

/// Builds instruction envelopes from prompts
pub struct PromptInterpreter {
    hbs: Handlebars<'static>,
    min_prompt_len: usize,
    weekly_span_days: u32,
    existing_limit: usize,
    option_count: usize,
}

impl PromptInterpreter {
    /// Create an interpreter, registering embedded templates and any overrides
    /// found in `prompts-dir`
    pub fn new(config: &ScheduleConfig) -> Result<Self, GenerationError> {
        Self::build(config, config.prompts_dir.as_deref())
    }

    /// Interpreter that ignores template overrides (for testing)
    pub fn embedded_only(config: &ScheduleConfig) -> Result<Self, GenerationError> {
        Self::build(config, None)
    }

    fn build(config: &ScheduleConfig, prompts_dir: Option<&Path>) -> Result<Self, GenerationError> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        for name in TEMPLATE_NAMES {
            let source = load_template(prompts_dir, name)?;
            hbs.register_template_string(name, source)
                .map_err(|e| GenerationError::Template(format!("{}: {}", name, e)))?;
        }

        Ok(Self {
            hbs,
            min_prompt_len: config.min_prompt_len,
            weekly_span_days: config.weekly_span_days,
            existing_limit: config.existing_context_limit,
            option_count: config.fallback_candidates,
        })
    }

    /// Reject prompts that are too short to plan from
    pub fn check_prompt<'a>(&self, prompt: &'a str) -> Result<&'a str, GenerationError> {
        let trimmed = prompt.trim();
        let len = trimmed.chars().count();
        if len < self.min_prompt_len {
            debug!(len, min = self.min_prompt_len, "check_prompt: rejected");
            return Err(GenerationError::PromptTooShort {
                len,
                min: self.min_prompt_len,
            });
        }
        Ok(trimmed)
    }

    /// Dates covered by a horizon, starting today
    pub fn date_range(&self, horizon: Horizon, today: NaiveDate) -> DateRange {
        let span = match horizon {
            Horizon::Daily => 0,
            Horizon::Weekly => self.weekly_span_days,
        };
        DateRange {
            start: today,
            end: today.checked_add_days(Days::new(span.into())).unwrap_or(today),
        }
    }

    /// Render the instruction envelope for a request
    pub fn interpret(
        &self,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<InstructionEnvelope, GenerationError> {
        let prompt = self.check_prompt(&request.prompt)?;
        let horizon = request.horizon.unwrap_or_else(|| Horizon::detect(prompt));
        let range = self.date_range(horizon, ctx.today());
        debug!(%horizon, ?range, "interpret: called");

        let (existing, existing_omitted) = self.summarize_existing(&request.existing, range, ctx.offset());
        let system_ctx = SystemTemplateContext {
            today: ctx.today().format("%A %Y-%m-%d").to_string(),
            range_start: range.start.to_string(),
            range_end: range.end.to_string(),
            utc_offset: ctx.offset().to_string(),
            existing,
            existing_omitted,
            generate_options: request.generate_options,
            option_count: self.option_count,
        };
        let user_ctx = UserTemplateContext {
            horizon: horizon.to_string(),
            prompt,
            nonce: ctx.nonce().to_string(),
        };

        let system_prompt = self
            .hbs
            .render(SCHEDULE_SYSTEM_NAME, &system_ctx)
            .map_err(|e| GenerationError::Template(e.to_string()))?;
        let user_prompt = self
            .hbs
            .render(SCHEDULE_USER_NAME, &user_ctx)
            .map_err(|e| GenerationError::Template(e.to_string()))?;

        info!(%horizon, options = request.generate_options, "Rendered instruction envelope");
        Ok(InstructionEnvelope {
            system_prompt,
            user_prompt,
            nonce: ctx.nonce(),
            horizon,
            range,
        })
    }

    /// Existing tasks inside the range, earliest first, capped at the limit
    fn summarize_existing(
        &self,
        existing: &[Task],
        range: DateRange,
        offset: FixedOffset,
    ) -> (Vec<ExistingTaskView>, usize) {
        let mut in_range: Vec<&Task> = existing.iter().filter(|t| range.contains(t.local_date(offset))).collect();
        in_range.sort_by_key(|t| t.start_time);

        let omitted = in_range.len().saturating_sub(self.existing_limit);
        let views = in_range
            .into_iter()
            .take(self.existing_limit)
            .map(|t| ExistingTaskView {
                title: t.title.clone(),
                category: t.category.to_string(),
                start: t.start_time.with_timezone(&offset).format("%a %Y-%m-%d %H:%M").to_string(),
                end: t.end_time.with_timezone(&offset).format("%H:%M").to_string(),
            })
            .collect();
        (views, omitted)
    }
}

/// Load a template, preferring `{dir}/{name}.hbs` over the embedded copy
fn load_template(prompts_dir: Option<&Path>, name: &str) -> Result<String, GenerationError> {
    if let Some(dir) = prompts_dir {
        let path: PathBuf = dir.join(format!("{}.hbs", name));
        if path.exists() {
            debug!("Loading prompt from override: {:?}", path);
            return std::fs::read_to_string(&path)
                .map_err(|e| GenerationError::Template(format!("Failed to read {}: {}", path.display(), e)));
        }
    }

    embedded::get_embedded(name)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::Template(format!("Prompt template not found: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use chrono::{DateTime, TimeZone, Utc};

    fn ctx() -> GenerationContext {
        // Monday
        GenerationContext::with_clock(DateTime::parse_from_rfc3339("2025-03-10T08:00:00+00:00").unwrap(), 7)
    }

    fn interpreter() -> PromptInterpreter {
        PromptInterpreter::embedded_only(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn test_horizon_detection() {
        assert_eq!(Horizon::detect("Plan my DAILY routine please"), Horizon::Daily);
        assert_eq!(Horizon::detect("what should I do today for math"), Horizon::Daily);
        assert_eq!(Horizon::detect("Plan a week with gym and coding"), Horizon::Weekly);
    }

    #[test]
    fn test_horizon_from_str() {
        assert_eq!("daily".parse::<Horizon>().unwrap(), Horizon::Daily);
        assert_eq!("Weekly".parse::<Horizon>().unwrap(), Horizon::Weekly);
        assert!("monthly".parse::<Horizon>().is_err());
    }

    #[test]
    fn test_check_prompt_rejects_short_and_empty() {
        let interp = interpreter();
        assert!(matches!(
            interp.check_prompt("gym"),
            Err(GenerationError::PromptTooShort { len: 3, min: 10 })
        ));
        assert!(interp.check_prompt("").is_err());
        assert!(interp.check_prompt("     short    ").is_err());
        assert_eq!(interp.check_prompt("  study calculus  ").unwrap(), "study calculus");
    }

    #[test]
    fn test_date_range() {
        let interp = interpreter();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let daily = interp.date_range(Horizon::Daily, today);
        assert_eq!(daily.start, today);
        assert_eq!(daily.end, today);

        let weekly = interp.date_range(Horizon::Weekly, today);
        assert_eq!(weekly.end, NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
    }

    #[test]
    fn test_interpret_multi_envelope() {
        let interp = interpreter();
        let ctx = ctx();
        let request = GenerationRequest::new("Plan a week with morning gym & evening coding");

        let envelope = interp.interpret(&request, &ctx).unwrap();

        assert_eq!(envelope.horizon, Horizon::Weekly);
        assert_eq!(envelope.nonce, ctx.nonce());
        assert!(envelope.system_prompt.contains("2025-03-10"));
        assert!(envelope.system_prompt.contains("2025-03-20"));
        assert!(envelope.system_prompt.contains("scheduleOptions"));
        assert!(envelope.system_prompt.contains("Saturday and Sunday only"));
        // not HTML-escaped
        assert!(envelope.user_prompt.contains("morning gym & evening coding"));
        assert!(envelope.user_prompt.contains(&ctx.nonce().to_string()));
    }

    #[test]
    fn test_interpret_single_envelope_uses_flat_array() {
        let interp = interpreter();
        let request = GenerationRequest::new("Study plan for today please")
            .single()
            .with_horizon(Some(Horizon::Weekly));

        let envelope = interp.interpret(&request, &ctx()).unwrap();

        assert_eq!(envelope.horizon, Horizon::Weekly);
        assert!(!envelope.system_prompt.contains("scheduleOptions"));
        assert!(envelope.system_prompt.contains("one JSON array"));
    }

    #[test]
    fn test_existing_tasks_summarized_and_capped() {
        let config = ScheduleConfig {
            existing_context_limit: 1,
            ..Default::default()
        };
        let interp = PromptInterpreter::embedded_only(&config).unwrap();
        let at = |d, h| Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap();
        let existing = vec![
            Task::new("Calculus lecture", at(11, 9), at(11, 11)).with_category(Category::Study),
            Task::new("Shift at cafe", at(12, 14), at(12, 18)).with_category(Category::Work),
            Task::new("Last month", at(1, 9), at(1, 10)),
        ];
        let request = GenerationRequest::new("Plan my week around classes").with_existing(existing);

        let envelope = interp.interpret(&request, &ctx()).unwrap();

        assert!(envelope.system_prompt.contains("Calculus lecture (study)"));
        assert!(!envelope.system_prompt.contains("Shift at cafe"));
        assert!(!envelope.system_prompt.contains("Last month"));
        assert!(envelope.system_prompt.contains("and 1 more"));
    }

    #[test]
    fn test_template_override_from_prompts_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schedule-user.hbs"), "PLAN {{horizon}}: {{prompt}}").unwrap();
        let config = ScheduleConfig {
            prompts_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let interp = PromptInterpreter::new(&config).unwrap();
        let envelope = interp
            .interpret(&GenerationRequest::new("Plan my week of revision"), &ctx())
            .unwrap();

        assert_eq!(envelope.user_prompt, "PLAN weekly: Plan my week of revision");
    }

    #[test]
    fn test_broken_override_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schedule-system.hbs"), "{{#if broken}").unwrap();
        let config = ScheduleConfig {
            prompts_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        assert!(matches!(PromptInterpreter::new(&config), Err(GenerationError::Template(_))));
    }
}
