//! CLI command definitions and subcommands

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{Category, Priority};
use crate::schedule::{Horizon, MergePolicy};

/// studyplan - student schedule planner
#[derive(Parser)]
#[command(
    name = "sp",
    about = "Plan study schedules from a plain-language prompt",
    version,
    after_help = "Logs are written to: ~/.local/share/studyplan/logs/studyplan.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Generate a schedule from a prompt and add the chosen tasks
    Generate {
        /// What you want to plan, e.g. "morning gym, evening coding, weekend projects"
        prompt: String,

        /// Planning horizon (detected from the prompt when omitted)
        #[arg(long)]
        horizon: Option<Horizon>,

        /// Ask for one schedule instead of several options
        #[arg(long)]
        single: bool,

        /// Pick option N without asking (1-based)
        #[arg(short, long, value_name = "N")]
        pick: Option<usize>,

        /// Overlap policy for the merge (overrides config)
        #[arg(long)]
        policy: Option<MergePolicy>,
    },

    /// List tasks, optionally limited to a date range
    List {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Add a task by hand
    Add {
        /// Task title
        title: String,

        /// Start time, e.g. 2025-03-10T09:00 (local time) or RFC 3339
        #[arg(long)]
        start: String,

        /// End time, same formats as --start
        #[arg(long)]
        end: String,

        /// Priority (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Category (study, work, personal, extracurricular, other)
        #[arg(short = 'k', long, default_value = "other")]
        category: Category,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Toggle a task's completion flag
    Done {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Show task statistics
    Stats,

    /// Manage courses
    Course {
        #[command(subcommand)]
        command: CourseCommand,
    },

    /// Manage course assignments
    Assignment {
        #[command(subcommand)]
        command: AssignmentCommand,
    },
}

/// Course subcommands
#[derive(Subcommand)]
pub enum CourseCommand {
    /// Add a course
    Add {
        /// Course name
        name: String,

        /// Course code, e.g. CS101
        #[arg(long)]
        code: String,

        /// Credit hours
        #[arg(long, default_value_t = crate::academics::DEFAULT_CREDITS)]
        credits: u32,

        #[arg(long)]
        professor: Option<String>,

        /// Meeting times, e.g. "Mon, Wed 10:00-11:00"
        #[arg(long)]
        schedule: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// List courses with a credit summary
    List,

    /// Change course fields; omitted options stay as they are
    Edit {
        /// Course code, id or unique id prefix
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        code: Option<String>,

        #[arg(long)]
        credits: Option<u32>,

        #[arg(long)]
        professor: Option<String>,

        #[arg(long)]
        schedule: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Toggle a course's completion flag
    Done {
        /// Course code, id or unique id prefix
        id: String,
    },

    /// Delete a course and its assignments
    Rm {
        /// Course code, id or unique id prefix
        id: String,
    },
}

/// Assignment subcommands
#[derive(Subcommand)]
pub enum AssignmentCommand {
    /// Add an assignment to a course
    Add {
        /// Assignment title
        title: String,

        /// Course code, id or unique id prefix
        #[arg(long)]
        course: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: NaiveDate,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List upcoming assignments
    List {
        /// Include completed assignments
        #[arg(long)]
        all: bool,
    },

    /// Toggle an assignment's completion flag
    Done {
        /// Assignment id or unique prefix
        id: String,
    },

    /// Delete an assignment
    Rm {
        /// Assignment id or unique prefix
        id: String,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyplan")
        .join("logs")
        .join("studyplan.log")
}
