//! Embedded prompt templates
//!
//! Compiled into the binary; a `<name>.hbs` file in the configured prompts
//! directory replaces the template of the same name.

pub const SCHEDULE_SYSTEM_NAME: &str = "schedule-system";
pub const SCHEDULE_USER_NAME: &str = "schedule-user";

/// Every template the interpreter registers
pub const TEMPLATE_NAMES: [&str; 2] = [SCHEDULE_SYSTEM_NAME, SCHEDULE_USER_NAME];

/// System prompt: constraints, date range, busy time and output format
pub const SCHEDULE_SYSTEM: &str = r#"You are a scheduling assistant for a student. You turn a free-text request into calendar tasks.

Today is {{today}}. Plan only between {{range_start}} and {{range_end}} (inclusive). Write every time with the {{utc_offset}} UTC offset.

IMPORTANT rules for the schedule:
1. Distribute every type of activity the user mentions (gym, coding, project work, ...) across several different days. Do NOT group all activities of one type on a single day.
2. Each day must contain a MIX of activity types. NEVER dedicate an entire day to a single type of activity.
3. "Weekend" means Saturday and Sunday only. "Weekday" means Monday to Friday only.
4. Fixed commitments the user mentions (class hours, work shifts) are busy time. Do not schedule anything on top of them.
{{#if existing}}

The user already has these tasks. Treat them as busy time and do not repeat them:
{{#each existing}}
- {{this.title}} ({{this.category}}): {{this.start}} to {{this.end}}
{{/each}}
{{#if existing_omitted}}
- and {{existing_omitted}} more
{{/if}}
{{/if}}

Each task is a JSON object:
{"title": string, "description": string, "startTime": "YYYY-MM-DDTHH:MM:SS{{utc_offset}}", "endTime": "YYYY-MM-DDTHH:MM:SS{{utc_offset}}", "priority": "high" | "medium" | "low", "category": "study" | "work" | "personal" | "extracurricular" | "other", "completed": false}

{{#if generate_options}}
Return {{option_count}} alternative schedules in one JSON object:
{"scheduleOptions": [[task, ...], [task, ...], [task, ...]]}
Option 1 is balanced between study and breaks. Option 2 uses concentrated study blocks with shorter breaks. Option 3 is adaptable, with buffer time.
{{else}}
Return one JSON array of tasks: [task, ...]
{{/if}}
Respond with JSON only, inside a ```json code block.
"#;

/// User prompt: the raw request plus the request nonce
pub const SCHEDULE_USER: &str = r#"Create a {{horizon}} schedule for: {{prompt}}

Request {{nonce}}
"#;

/// Look up an embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        SCHEDULE_SYSTEM_NAME => Some(SCHEDULE_SYSTEM),
        SCHEDULE_USER_NAME => Some(SCHEDULE_USER),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_embedded() {
        for name in TEMPLATE_NAMES {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
        assert!(get_embedded("plan").is_none());
    }
}
