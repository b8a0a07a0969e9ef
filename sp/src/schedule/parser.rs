//! Response extraction and parsing
//!
//! Pulls the JSON payload out of free-form model output and classifies it as
//! a single task list, a set of candidate lists, or unparseable.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// A task record as the model wrote it; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub completed: Option<bool>,
}

impl RawTask {
    /// Read a record from a JSON value, accepting camelCase and snake_case keys.
    /// Returns `None` for anything that is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k))
                .find_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        };

        Some(Self {
            title: text(&["title", "name"]),
            description: text(&["description"]),
            start_time: text(&["startTime", "start_time", "start"]),
            end_time: text(&["endTime", "end_time", "end"]),
            priority: text(&["priority"]),
            category: text(&["category"]),
            completed: obj.get("completed").and_then(Value::as_bool),
        })
    }
}

/// Outcome of parsing a model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSchedule {
    Single(Vec<RawTask>),
    Multi(Vec<Vec<RawTask>>),
    /// Carries the reason, for logs and the fallback message
    Unparseable(String),
}

/// Extracts and parses schedule payloads
pub struct ResponseParser {
    fence: Regex,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            // ```json ... ``` or bare ``` ... ```
            fence: Regex::new(r"(?s)```[A-Za-z]*\s*\n?(.*?)```").expect("fence regex is valid"),
        }
    }

    /// Every JSON value the response contains, in the order they should be
    /// tried: fenced blocks first, then the whole text.
    ///
    /// Within each source, values are read from each `{` or `[` that is not
    /// inside an earlier value, so prose brackets before the payload and text
    /// after it are skipped. The second element is the first syntax error met.
    pub fn json_values(&self, text: &str) -> (Vec<Value>, Option<serde_json::Error>) {
        let mut sources: Vec<&str> = self
            .fence
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|inner| !inner.is_empty())
            .collect();
        debug!(fences = sources.len(), "json_values: called");
        sources.push(text);

        let mut values = Vec::new();
        let mut first_error = None;
        for source in sources {
            scan_values(source, &mut values, &mut first_error);
        }
        (values, first_error)
    }

    /// Parse a response for either mode
    ///
    /// The first embedded value with the expected shape wins.
    pub fn parse(&self, text: &str, generate_options: bool) -> ParsedSchedule {
        let (values, syntax_error) = self.json_values(text);

        let mut first_mismatch = None;
        for value in &values {
            let parsed = if generate_options {
                Self::parse_options(value)
            } else {
                Self::parse_single(value)
            };
            match parsed {
                ParsedSchedule::Unparseable(reason) => {
                    first_mismatch.get_or_insert(reason);
                }
                parsed => return parsed,
            }
        }

        let reason = match (first_mismatch, syntax_error) {
            (Some(reason), _) => reason,
            (None, Some(e)) => format!("invalid JSON: {}", e),
            (None, None) => "no JSON found in response".to_string(),
        };
        ParsedSchedule::Unparseable(reason)
    }

    fn parse_options(value: &Value) -> ParsedSchedule {
        let Some(options) = value.get("scheduleOptions").and_then(Value::as_array) else {
            return ParsedSchedule::Unparseable("missing scheduleOptions array".to_string());
        };

        let mut candidates = Vec::with_capacity(options.len());
        for (i, option) in options.iter().enumerate() {
            let Some(items) = option.as_array() else {
                return ParsedSchedule::Unparseable(format!("scheduleOptions[{}] is not an array", i));
            };
            let tasks = Self::records(items);
            if tasks.is_empty() {
                return ParsedSchedule::Unparseable(format!("scheduleOptions[{}] has no tasks", i));
            }
            candidates.push(tasks);
        }

        if candidates.is_empty() {
            return ParsedSchedule::Unparseable("scheduleOptions is empty".to_string());
        }
        ParsedSchedule::Multi(candidates)
    }

    fn parse_single(value: &Value) -> ParsedSchedule {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(obj) => match obj.get("tasks").and_then(Value::as_array) {
                Some(items) => items,
                None => return ParsedSchedule::Unparseable("expected a JSON array of tasks".to_string()),
            },
            _ => return ParsedSchedule::Unparseable("expected a JSON array of tasks".to_string()),
        };

        let tasks = Self::records(items);
        if tasks.is_empty() {
            return ParsedSchedule::Unparseable("response contained no tasks".to_string());
        }
        ParsedSchedule::Single(tasks)
    }

    fn records(items: &[Value]) -> Vec<RawTask> {
        items.iter().filter_map(RawTask::from_value).collect()
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the top-level JSON values of `text`, resuming after each one
fn scan_values(text: &str, values: &mut Vec<Value>, first_error: &mut Option<serde_json::Error>) {
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(['{', '[']) {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                values.push(value);
                pos = start + stream.byte_offset();
            }
            Some(Err(e)) => {
                first_error.get_or_insert(e);
                pos = start + 1;
            }
            None => pos = start + 1,
        }
    }
}
