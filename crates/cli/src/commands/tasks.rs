use super::print_json;
use crate::context::AppContext;
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Subcommand};
use colored::*;
use common::EventBus;
use todo::{Priority, SortBy, SortOrder, Task, TaskFilter, TaskService, TaskSettingsUpdate, TaskUpdate};

#[derive(Debug, Args)]
pub struct TasksCommand {
    #[command(subcommand)]
    command: TasksSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TasksSubcommand {
    /// Add a task to the top of the list
    Add {
        text: String,
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Print the created task as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show tasks
    List {
        #[arg(long, default_value = "all")]
        filter: TaskFilter,
        #[arg(long, default_value = "createdAt")]
        sort: SortBy,
        #[arg(long, default_value = "desc")]
        order: SortOrder,
        #[arg(long)]
        json: bool,
    },
    /// Flip a task between active and done
    Toggle { id: String },
    /// Change text, priority or completion of a task
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        done: Option<bool>,
    },
    /// Delete a task
    Rm { id: String },
    /// Delete every completed task
    #[command(name = "clear-completed")]
    ClearCompleted,
    /// Totals and completion rate
    Stats {
        #[arg(long)]
        json: bool,
    },
}

impl TasksCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let svc = TaskService::with_options(ctx.area.clone(), ctx.schema_version(), EventBus::default());
        if let Some(err) = svc.error() {
            bail!("Failed to load tasks: {}", err);
        }
        handle(&svc, self.command).await
    }
}

async fn handle(svc: &TaskService, cmd: TasksSubcommand) -> Result<()> {
    match cmd {
        TasksSubcommand::Add { text, priority, json } => {
            let task = svc.add_task(&text, priority).await.context("Failed to add task")?;
            if json {
                print_json(&task)?;
            } else {
                println!("{} Added task {}", "✓".green(), task.id.bold());
            }
        }
        TasksSubcommand::List {
            filter,
            sort,
            order,
            json,
        } => {
            svc.update_settings(TaskSettingsUpdate {
                sort_by: Some(sort),
                sort_order: Some(order),
                filter_by: Some(filter),
            });
            let tasks = svc.visible_tasks();
            if json {
                print_json(&tasks)?;
                return Ok(());
            }

            let stats = svc.stats();
            println!(
                "{} {}",
                "☐".cyan(),
                format!("Tasks: {} shown, {} active, {} done", tasks.len(), stats.active, stats.completed)
                    .bold()
            );
            for task in &tasks {
                print_task(task);
            }
        }
        TasksSubcommand::Toggle { id } => {
            if !svc.toggle_task(&id).await.context("Failed to toggle task")? {
                bail!("task not found: {}", id);
            }
            let done = svc.get(&id).map(|t| t.done).unwrap_or_default();
            let state = if done { "done" } else { "active" };
            println!("{} Task {} is now {}", "✓".green(), id, state);
        }
        TasksSubcommand::Edit {
            id,
            text,
            priority,
            done,
        } => {
            let update = TaskUpdate { text, priority, done };
            if update.is_empty() {
                bail!("nothing to change, pass --text, --priority or --done");
            }
            if !svc.update_task(&id, update).await.context("Failed to update task")? {
                bail!("task not found: {}", id);
            }
            println!("{} Task {} updated", "✓".green(), id);
        }
        TasksSubcommand::Rm { id } => {
            if !svc.remove_task(&id).await.context("Failed to remove task")? {
                bail!("task not found: {}", id);
            }
            println!("{} Task {} removed", "✓".green(), id);
        }
        TasksSubcommand::ClearCompleted => {
            let removed = svc.clear_completed().await.context("Failed to clear completed tasks")?;
            println!("{} Removed {} completed tasks", "✓".green(), removed);
        }
        TasksSubcommand::Stats { json } => {
            let stats = svc.stats();
            if json {
                print_json(&stats)?;
                return Ok(());
            }
            println!("{} Task statistics", "Σ".yellow());
            println!("  total: {}", stats.total);
            println!("  active: {}  completed: {}", stats.active, stats.completed);
            println!("  completion: {:.2}%", stats.completion_rate);
        }
    }
    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.done { "[x]".green() } else { "[ ]".normal() };
    let priority = match task.priority {
        Priority::High => "high".red(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".blue(),
    };
    let text = if task.done {
        task.text.dimmed()
    } else {
        task.text.bold()
    };
    let created = task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    println!("{} {} {} [{}] {}", mark, task.id.dimmed(), text, priority, created.to_string().dimmed());
}
