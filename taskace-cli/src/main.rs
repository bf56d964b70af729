use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use taskace_core::time::{local_date, parse_local_deadline, parse_timezone};
use taskace_core::{
    JsonFileStore, NewTask, NewTemplate, PreferencesPatch, Priority, StudyTime, SystemClock, Task,
    TaskManager, TaskPatch, TaskQuery, parse_block_spec,
};

mod config;
mod state;

type Manager = TaskManager<JsonFileStore, SystemClock>;

#[derive(Parser, Debug)]
#[command(name = "taskace", version, about = "Personal task manager with a weighted 7-day planner")]
struct Cli {
    /// Principal to load instead of [profile] principal
    #[arg(long, global = true)]
    principal: Option<String>,

    /// IANA timezone instead of [profile] timezone
    #[arg(long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add, edit, complete and query tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Day templates the planner fills
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Scheduling preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },

    /// The computed 7-day schedule
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Completion rate, due counts and points
    Stats,

    /// Write or print ~/.taskace/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Add a task
    Add {
        title: String,

        /// Local deadline, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD" (end of day)
        #[arg(long)]
        deadline: String,

        /// high | medium | low
        #[arg(long, default_value = "medium")]
        priority: Priority,

        #[arg(long, default_value = "Personal")]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Estimated minutes (defaults to the study session length)
        #[arg(long)]
        duration: Option<u32>,
    },

    /// List tasks (pending only unless --all)
    List {
        #[arg(long)]
        all: bool,
    },

    /// Show one task with its weight and slot
    Show { id: String },

    /// Edit task fields
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        deadline: Option<String>,

        #[arg(long, conflicts_with = "clear_duration")]
        duration: Option<u32>,

        /// Drop the estimate and fall back to the session length
        #[arg(long)]
        clear_duration: bool,
    },

    /// Mark a task done (+10 points)
    Complete { id: String },

    /// Undo a completion within 30 seconds (-10 points)
    Undo { id: String },

    /// Delete a task
    Delete { id: String },

    /// Search title and description
    Search {
        query: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Tasks due today
    Today,

    /// Completed tasks, optionally only those finished on a date
    Done {
        /// Local date, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Add a template from blocks like --block "09:00-12:00 Work/Study"
    Add {
        name: String,

        #[arg(long = "block", required = true)]
        blocks: Vec<String>,
    },

    List,

    /// Make a template the active one
    Select { id: String },
}

#[derive(Subcommand, Debug)]
enum PrefsCommand {
    Show,

    Set {
        /// morning | afternoon | evening | night
        #[arg(long)]
        study_time: Option<StudyTime>,

        #[arg(long)]
        max_tasks: Option<u32>,

        /// Minutes between tasks
        #[arg(long)]
        break_minutes: Option<u32>,

        /// Default task length in minutes
        #[arg(long)]
        session_minutes: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Print the schedule, optionally for a single date
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Recompute from current state
    Reschedule,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Init,
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },

        Command::Task { command } => {
            let mut m = open_manager(cli.principal, cli.timezone)?;
            run_task(&mut m, command)?;
        }

        Command::Template { command } => {
            let mut m = open_manager(cli.principal, cli.timezone)?;
            run_template(&mut m, command)?;
        }

        Command::Prefs { command } => {
            let mut m = open_manager(cli.principal, cli.timezone)?;
            match command {
                PrefsCommand::Show => print_prefs(&m),
                PrefsCommand::Set {
                    study_time,
                    max_tasks,
                    break_minutes,
                    session_minutes,
                } => {
                    let patch = PreferencesPatch {
                        preferred_study_time: study_time,
                        max_tasks_per_day: max_tasks,
                        break_duration: break_minutes,
                        study_session_duration: session_minutes,
                    };
                    if patch == PreferencesPatch::default() {
                        bail!("nothing to change (see `taskace prefs set --help`)");
                    }
                    m.update_preferences(patch).context("update preferences")?;
                    print_prefs(&m);
                }
            }
        }

        Command::Schedule { command } => {
            let mut m = open_manager(cli.principal, cli.timezone)?;
            match command {
                ScheduleCommand::Show { date } => print_schedule(&m, date),
                ScheduleCommand::Reschedule => {
                    let s = m.force_reschedule();
                    println!(
                        "Rescheduled: {} placed, {} unplaced",
                        s.len(),
                        s.unplaced.len()
                    );
                    print_schedule(&m, None);
                }
            }
        }

        Command::Stats => {
            let m = open_manager(cli.principal, cli.timezone)?;
            let s = m.stats();
            println!("Tasks:           {} ({} done, {} pending)", s.total, s.completed, s.pending);
            println!("Completion rate: {}%", s.completion_rate);
            println!("Due today:       {}", s.due_today);
            println!("Due soon:        {}", s.due_soon);
            println!("Points:          {} ({}% of goal)", s.points, s.points_progress);
            match s.next_milestone {
                Some(next) => println!("Next milestone:  {next}"),
                None => println!("Next milestone:  all reached"),
            }
        }
    }

    Ok(())
}

fn open_manager(principal: Option<String>, timezone: Option<String>) -> Result<Manager> {
    let cfg = config::load_config()?;
    let principal = principal.unwrap_or_else(|| cfg.profile.principal.clone());
    let tz = match timezone {
        Some(name) => parse_timezone(&name).with_context(|| format!("--timezone {name}"))?,
        None => cfg.timezone()?,
    };
    let dir = cfg.data_dir()?;
    debug!(%principal, %tz, dir = %dir.display(), "opening task state");

    TaskManager::open(JsonFileStore::new(&dir), principal, SystemClock, tz)
        .with_context(|| format!("load task state from {}", dir.display()))
}

fn run_task(m: &mut Manager, command: TaskCommand) -> Result<()> {
    let tz = m.timezone();

    match command {
        TaskCommand::Add {
            title,
            deadline,
            priority,
            category,
            description,
            duration,
        } => {
            let mut new = NewTask::new(title, parse_deadline(&deadline, tz)?)
                .with_priority(priority)
                .with_category(category)
                .with_description(description);
            new.estimated_duration = duration;

            let id = m.add_task(new).context("add task")?;
            println!("Added {id}");
            if let Some(a) = m.schedule().for_task(&id) {
                println!("Scheduled {} {}", a.date, a.time_slot());
            } else {
                println!("Not scheduled within the next 7 days");
            }
        }

        TaskCommand::List { all } => {
            let tasks: Vec<&Task> = m.tasks().iter().filter(|t| all || !t.completed).collect();
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for t in tasks {
                print_task_line(t, tz);
            }
        }

        TaskCommand::Show { id } => {
            let t = m
                .task(&id)
                .with_context(|| format!("task not found: {id}"))?;
            let w = m.weight(&id)?;
            print_task_line(t, tz);
            if !t.description.is_empty() {
                println!("  {}", t.description);
            }
            println!(
                "  weight {} (priority {}, deadline {}, category {}, duration {})",
                w.total, w.priority, w.deadline, w.category, w.duration
            );
            match m.schedule().for_task(&id) {
                Some(a) => println!("  slot {} {}", a.date, a.time_slot()),
                None if t.completed => {
                    if let Some(secs) = m.remaining_undo_seconds(&id)?.filter(|s| *s > 0) {
                        println!("  undo available for {secs}s");
                    }
                }
                None => println!("  not scheduled within the next 7 days"),
            }
        }

        TaskCommand::Edit {
            id,
            title,
            description,
            category,
            priority,
            deadline,
            duration,
            clear_duration,
        } => {
            let patch = TaskPatch {
                title,
                description,
                category,
                priority,
                deadline: deadline.map(|d| parse_deadline(&d, tz)).transpose()?,
                estimated_duration: if clear_duration {
                    Some(None)
                } else {
                    duration.map(Some)
                },
                last_worked_on: None,
            };
            if patch.is_empty() {
                bail!("nothing to change (see `taskace task edit --help`)");
            }
            m.update_task(&id, patch).context("edit task")?;
            if let Some(t) = m.task(&id) {
                print_task_line(t, tz);
            }
        }

        TaskCommand::Complete { id } => {
            m.complete_task(&id).context("complete task")?;
            println!(
                "Completed {id}. +10 points ({} total). Undo within 30s: taskace task undo {id}",
                m.points()
            );
        }

        TaskCommand::Undo { id } => {
            m.uncomplete_task(&id).context("undo completion")?;
            println!("Reopened {id}. -10 points ({} total)", m.points());
        }

        TaskCommand::Delete { id } => {
            let removed = m.delete_task(&id).context("delete task")?;
            println!("Deleted {} ({})", removed.id, removed.title);
        }

        TaskCommand::Search { query, category } => {
            let q = TaskQuery {
                text: query,
                category,
            };
            let hits = m.search(&q);
            if hits.is_empty() {
                println!("No matching tasks.");
            }
            for t in hits {
                print_task_line(t, tz);
            }
        }

        TaskCommand::Today => {
            let due = m.tasks_due_today();
            println!("Due today ({}): {}", m.today(), due.len());
            for t in due {
                print_task_line(t, tz);
            }
        }

        TaskCommand::Done { date } => {
            let done = match date {
                Some(d) => m.tasks_completed_on(d),
                None => m.completed_tasks(),
            };
            if done.is_empty() {
                println!("Nothing completed.");
            }
            for t in done {
                print_task_line(t, tz);
            }
        }
    }

    Ok(())
}

fn run_template(m: &mut Manager, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::Add { name, blocks } => {
            let blocks = blocks
                .iter()
                .map(|b| parse_block_spec(b))
                .collect::<Result<Vec<_>, _>>()
                .context("parse --block")?;
            let id = m
                .add_schedule_template(NewTemplate::new(name, blocks))
                .context("add template")?;
            println!("Added template {id}. Activate with: taskace template select {id}");
        }

        TemplateCommand::List => {
            let active = m.active_template().map(|t| t.id.clone());
            for t in m.templates() {
                let marker = if active.as_deref() == Some(t.id.as_str()) { "*" } else { " " };
                println!("{marker} {}  {}  ({} schedulable min)", t.id, t.name, t.schedulable_minutes());
                for b in &t.blocks {
                    println!("      {b}");
                }
            }
        }

        TemplateCommand::Select { id } => {
            m.select_active_template(&id).context("select template")?;
            let name = m.active_template().map(|t| t.name.as_str()).unwrap_or_default();
            println!("Active template: {name}");
            print_schedule(m, None);
        }
    }

    Ok(())
}

/// "YYYY-MM-DD HH:MM", or a bare date meaning 23:59 that day.
fn parse_deadline(s: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let full = if s.contains(' ') {
        s.to_string()
    } else {
        format!("{s} 23:59")
    };
    Ok(parse_local_deadline(&full, tz)?)
}

fn print_task_line(t: &Task, tz: Tz) {
    let mark = if t.completed { "x" } else { " " };
    let due = t.deadline.with_timezone(&tz).format("%Y-%m-%d %H:%M");
    println!(
        "[{mark}] {}  {}  ({}, {}) due {due}",
        t.id, t.title, t.priority, t.category
    );
}

fn print_prefs(m: &Manager) {
    let p = m.preferences();
    println!("Preferred study time: {}", p.preferred_study_time);
    println!("Max tasks per day:    {}", p.max_tasks_per_day);
    println!("Break:                {} min", p.break_duration);
    println!("Study session:        {} min", p.study_session_duration);
}

fn print_schedule(m: &Manager, only: Option<NaiveDate>) {
    let s = m.schedule();
    let Some(template) = m.active_template() else {
        println!("No active template; nothing is scheduled.");
        return;
    };
    println!("Template: {}", template.name);

    for date in s.dates().into_iter().filter(|d| only.is_none_or(|o| o == *d)) {
        println!("\n{date}");
        for a in s.on(date) {
            println!("  {}  {}", a.time_slot(), a.title);
        }
    }

    if only.is_none() && !s.unplaced.is_empty() {
        println!("\nUnplaced ({}):", s.unplaced.len());
        for id in &s.unplaced {
            if let Some(t) = m.task(id) {
                let due = local_date(t.deadline, m.timezone());
                println!("  {}  {} (due {due})", t.id, t.title);
            }
        }
    }
}
