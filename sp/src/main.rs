//! studyplan - student schedule planner
//!
//! CLI entry point: task CRUD, statistics, the course planner, and
//! prompt-driven schedule generation.

use std::fs;
use std::io::{self, Write};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::info;

use studyplan::academics::{Assignment, Course, CoursePatch, JsonAcademicStore};
use studyplan::analytics;
use studyplan::cli::{AssignmentCommand, Cli, Command, CourseCommand, get_log_path};
use studyplan::config::Config;
use studyplan::domain::{Category, Priority, Task};
use studyplan::llm::create_client;
use studyplan::schedule::{
    CandidateSet, GenerationContext, GenerationRequest, Horizon, MergePolicy, MergeReport, Schedule, SchedulePipeline,
    ScheduleSource, commit, parse_timestamp,
};
use studyplan::store::{JsonTaskStore, TaskStore};

fn setup_logging(level: &str) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to the log file, never to stdout/stderr
    let level: tracing::Level = level.parse().map_err(|_| eyre!("Invalid log level: {}", level))?;
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    info!(
        "studyplan loaded config: provider={}, tasks-file={}",
        config.llm.provider,
        config.storage.tasks_file.display()
    );

    match cli.command {
        Command::Generate {
            prompt,
            horizon,
            single,
            pick,
            policy,
        } => cmd_generate(&config, prompt, horizon, single, pick, policy).await,
        Command::List { from, to } => cmd_list(&config, from, to),
        Command::Add {
            title,
            start,
            end,
            priority,
            category,
            description,
        } => cmd_add(&config, title, &start, &end, priority, category, description),
        Command::Done { id } => cmd_done(&config, &id),
        Command::Rm { id } => cmd_rm(&config, &id),
        Command::Stats => cmd_stats(&config),
        Command::Course { command } => cmd_course(&config, command),
        Command::Assignment { command } => cmd_assignment(&config, command),
    }
}

fn local_offset() -> FixedOffset {
    *Local::now().fixed_offset().offset()
}

fn open_store(config: &Config) -> Result<JsonTaskStore> {
    JsonTaskStore::open(&config.storage.tasks_file)
        .with_context(|| format!("Failed to open task store {}", config.storage.tasks_file.display()))
}

async fn cmd_generate(
    config: &Config,
    prompt: String,
    horizon: Option<Horizon>,
    single: bool,
    pick: Option<usize>,
    policy: Option<MergePolicy>,
) -> Result<()> {
    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let pipeline = SchedulePipeline::new(llm, config)?;
    let mut store = open_store(config)?;

    let mut request = GenerationRequest::new(prompt)
        .with_horizon(horizon)
        .with_existing(store.list()?);
    if single {
        request = request.single();
    }

    println!("{}", "Generating schedule...".dimmed());
    let mut ctx = GenerationContext::new();
    let outcome = pipeline.generate(&request, &mut ctx).await?;

    println!("{}", outcome.message.bright_cyan());
    if let ScheduleSource::Fallback { reason, .. } = &outcome.source {
        println!("{}", format!("({})", reason).dimmed());
    }

    let offset = ctx.offset();
    let tasks = match outcome.schedule {
        Schedule::Single(tasks) => {
            print_tasks(&tasks, offset);
            tasks
        }
        Schedule::Candidates(set) => {
            print_candidates(&set, offset);
            let choice = match pick {
                Some(n) => Some(n),
                None => prompt_choice(set.len())?,
            };
            let Some(n) = choice else {
                set.dismiss();
                println!("No changes made.");
                return Ok(());
            };
            let index = n.checked_sub(1).ok_or_else(|| eyre!("Options are numbered from 1"))?;
            set.select(index)?
        }
    };

    let policy = policy.unwrap_or(config.schedule.merge_policy);
    let report = commit(&mut store, tasks, policy)?;
    print_report(&report, outcome.horizon);
    Ok(())
}

/// Ask for a 1-based option; empty input dismisses
fn prompt_choice(count: usize) -> Result<Option<usize>> {
    print!("Choose an option [1-{}] (Enter to dismiss): ", count);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).context("Failed to read choice")?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let n = line
        .parse::<usize>()
        .map_err(|_| eyre!("'{}' is not an option number", line))?;
    Ok(Some(n))
}

fn print_candidates(set: &CandidateSet, offset: FixedOffset) {
    for (i, candidate) in set.iter().enumerate() {
        println!();
        println!(
            "{} {} - {}",
            format!("[{}]", i + 1).bold(),
            candidate.label.bold(),
            candidate.description.dimmed()
        );
        print_tasks(&candidate.tasks, offset);
    }
    println!();
}

fn print_tasks(tasks: &[Task], offset: FixedOffset) {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by_key(|t| t.start_time);

    let mut current_day: Option<NaiveDate> = None;
    for task in sorted {
        let start = task.start_time.with_timezone(&offset);
        let end = task.end_time.with_timezone(&offset);
        if current_day != Some(start.date_naive()) {
            current_day = Some(start.date_naive());
            println!("  {}", start.format("%A %Y-%m-%d").to_string().underline());
        }

        let check = if task.completed { "✓".green() } else { " ".normal() };
        let title = match task.priority {
            Priority::High => task.title.red(),
            Priority::Medium => task.title.normal(),
            Priority::Low => task.title.dimmed(),
        };
        println!(
            "    {} {} {}-{} {} {}",
            check,
            task.id.short().cyan(),
            start.format("%H:%M"),
            end.format("%H:%M"),
            title,
            format!("[{}]", task.category).dimmed()
        );
    }
}

fn print_report(report: &MergeReport, horizon: Horizon) {
    println!(
        "{} Added {} tasks to your {} schedule.",
        "✓".green(),
        report.added,
        horizon
    );
    if report.shifted > 0 {
        println!("  {} tasks moved later to avoid overlaps", report.shifted);
    }
    for overlap in &report.overlaps {
        println!(
            "  {} '{}' overlaps '{}'",
            "!".yellow(),
            overlap.incoming_title,
            overlap.conflicting_title
        );
    }
}

fn cmd_list(config: &Config, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let store = open_store(config)?;
    let offset = local_offset();

    let tasks = if from.is_none() && to.is_none() {
        store.list()?
    } else {
        let start = match from {
            Some(date) => day_start(date, offset)?,
            None => DateTime::<Utc>::MIN_UTC,
        };
        let end = match to {
            Some(date) => day_start(date, offset)? + TimeDelta::days(1) - TimeDelta::seconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        };
        store.list_by_range(start, end)?
    };

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    print_tasks(&tasks, offset);
    Ok(())
}

/// Local midnight of `date` as UTC
fn day_start(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.to_utc())
        .ok_or_else(|| eyre!("Invalid date {}", date))
}

fn cmd_add(
    config: &Config,
    title: String,
    start: &str,
    end: &str,
    priority: Priority,
    category: Category,
    description: Option<String>,
) -> Result<()> {
    let offset = local_offset();
    let start_time = parse_timestamp(start, offset).ok_or_else(|| eyre!("Invalid start time: {}", start))?;
    let end_time = parse_timestamp(end, offset).ok_or_else(|| eyre!("Invalid end time: {}", end))?;

    let mut task = Task::new(title, start_time, end_time)
        .with_priority(priority)
        .with_category(category);
    if let Some(description) = description {
        task = task.with_description(description);
    }

    let mut store = open_store(config)?;
    let task = store.create(task)?;
    println!("{} Added task {} {}", "✓".green(), task.id.short().cyan(), task.title);
    Ok(())
}

fn cmd_done(config: &Config, id: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let id = store.resolve_id(id)?;
    let task = store.toggle_completion(&id)?;
    let state = if task.completed { "completed" } else { "not completed" };
    println!("{} {} marked {}", "✓".green(), task.title, state);
    Ok(())
}

fn cmd_rm(config: &Config, id: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let id = store.resolve_id(id)?;
    let task = store.get(&id)?;
    store.delete(&id)?;
    println!("{} Deleted task {} {}", "✓".green(), id.short().cyan(), task.title);
    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let now = Local::now().fixed_offset();
    let stats = analytics::compute(&store.list()?, now);

    println!("{}", "Task statistics".bold());
    println!("  Tasks:           {}", stats.total);
    println!("  Completion rate: {}%", stats.completion_rate);

    if !stats.hours_by_category.is_empty() {
        println!("\n{}", "Time by category (hours)".bold());
        for (category, hours) in &stats.hours_by_category {
            println!("  {:<16} {:.1}", category.label(), hours);
        }
    }

    if !stats.tasks_by_priority.is_empty() {
        println!("\n{}", "Tasks by priority".bold());
        for (priority, count) in &stats.tasks_by_priority {
            println!("  {:<16} {}", priority.to_string(), count);
        }
    }

    println!("\n{}", "Upcoming deadlines (next 3 days)".bold());
    if stats.upcoming.is_empty() {
        println!("  No upcoming deadlines in the next 3 days");
    } else {
        for task in &stats.upcoming {
            println!(
                "  {} {} {}",
                task.id.short().cyan(),
                task.end_time.with_timezone(now.offset()).format("%a %m-%d %H:%M"),
                task.title
            );
        }
    }

    if let Some(hour) = stats.busiest_hour() {
        println!("\n  Busiest hour: {:02}:00 ({} tasks)", hour, stats.busy_hours[hour]);
    }
    Ok(())
}

fn open_academics(config: &Config) -> Result<JsonAcademicStore> {
    JsonAcademicStore::open(&config.storage.academics_file)
        .with_context(|| format!("Failed to open course planner {}", config.storage.academics_file.display()))
}

fn cmd_course(config: &Config, command: CourseCommand) -> Result<()> {
    let mut store = open_academics(config)?;
    match command {
        CourseCommand::Add {
            name,
            code,
            credits,
            professor,
            schedule,
            location,
        } => {
            let mut course = Course::new(name, code);
            course.credits = credits;
            course.professor = professor.unwrap_or_default();
            course.schedule = schedule.unwrap_or_default();
            course.location = location.unwrap_or_default();
            let course = store.apply(|p| p.add_course(course))?;
            println!(
                "{} Added course {} {} {}",
                "✓".green(),
                course.id.short().cyan(),
                course.code.bold(),
                course.name
            );
        }
        CourseCommand::List => print_courses(&store),
        CourseCommand::Edit {
            id,
            name,
            code,
            credits,
            professor,
            schedule,
            location,
        } => {
            let id = store.planner().resolve_course(&id)?;
            let patch = CoursePatch {
                name,
                code,
                credits,
                professor,
                schedule,
                location,
            };
            let course = store.apply(|p| p.update_course(&id, patch))?;
            println!("{} Updated course {} {}", "✓".green(), course.code.bold(), course.name);
        }
        CourseCommand::Done { id } => {
            let id = store.planner().resolve_course(&id)?;
            let course = store.apply(|p| p.toggle_course(&id))?;
            let state = if course.completed { "completed" } else { "not completed" };
            println!("{} {} marked {}", "✓".green(), course.code.bold(), state);
        }
        CourseCommand::Rm { id } => {
            let id = store.planner().resolve_course(&id)?;
            let (course, removed) = store.apply(|p| p.delete_course(&id))?;
            println!("{} Deleted course {} {}", "✓".green(), course.code.bold(), course.name);
            if removed > 0 {
                println!("  {} assignments removed with it", removed);
            }
        }
    }
    Ok(())
}

fn print_courses(store: &JsonAcademicStore) {
    let planner = store.planner();
    if planner.courses().is_empty() {
        println!("No courses.");
        return;
    }

    for course in planner.courses() {
        let check = if course.completed { "✓".green() } else { " ".normal() };
        println!(
            "  {} {} {} {} {}",
            check,
            course.id.short().cyan(),
            course.code.bold(),
            course.name,
            format!("[{} credits]", course.credits).dimmed()
        );
        let details: Vec<&str> = [&course.professor, &course.schedule, &course.location]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if !details.is_empty() {
            println!("      {}", details.join(" | ").dimmed());
        }
    }

    let credits = planner.credit_summary();
    println!("\n  Credits: {} total, {} completed", credits.total, credits.completed);
}

fn cmd_assignment(config: &Config, command: AssignmentCommand) -> Result<()> {
    let mut store = open_academics(config)?;
    match command {
        AssignmentCommand::Add {
            title,
            course,
            due,
            description,
        } => {
            let course_id = store.planner().resolve_course(&course)?;
            let mut assignment = Assignment::new(course_id, title, due);
            if let Some(description) = description {
                assignment = assignment.with_description(description);
            }
            let assignment = store.apply(|p| p.add_assignment(assignment))?;
            println!(
                "{} Added assignment {} {} due {}",
                "✓".green(),
                assignment.id.short().cyan(),
                assignment.title,
                assignment.due_date
            );
        }
        AssignmentCommand::List { all } => print_assignments(&store, all),
        AssignmentCommand::Done { id } => {
            let id = store.planner().resolve_assignment(&id)?;
            let assignment = store.apply(|p| p.toggle_assignment(&id))?;
            let state = if assignment.completed { "completed" } else { "not completed" };
            println!("{} {} marked {}", "✓".green(), assignment.title, state);
        }
        AssignmentCommand::Rm { id } => {
            let id = store.planner().resolve_assignment(&id)?;
            let assignment = store.apply(|p| p.delete_assignment(&id))?;
            println!(
                "{} Deleted assignment {} {}",
                "✓".green(),
                assignment.id.short().cyan(),
                assignment.title
            );
        }
    }
    Ok(())
}

fn print_assignments(store: &JsonAcademicStore, all: bool) {
    let planner = store.planner();
    let mut assignments: Vec<&Assignment> = if all {
        planner.assignments().iter().collect()
    } else {
        planner.upcoming_assignments()
    };
    assignments.sort_by_key(|a| a.due_date);

    if assignments.is_empty() {
        println!("{}", if all { "No assignments." } else { "No upcoming assignments." });
        return;
    }

    for assignment in assignments {
        let check = if assignment.completed { "✓".green() } else { " ".normal() };
        let code = planner
            .course(&assignment.course_id)
            .map(|c| c.code.as_str())
            .unwrap_or("?");
        println!(
            "  {} {} {} {} {}",
            check,
            assignment.id.short().cyan(),
            assignment.due_date.format("%a %Y-%m-%d"),
            assignment.title,
            format!("[{}]", code).dimmed()
        );
        if !assignment.description.is_empty() {
            println!("      {}", assignment.description.dimmed());
        }
    }
}
