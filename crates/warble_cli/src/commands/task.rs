//! Task commands.
//!
//! Listing renders a table; the single-task commands print key/value
//! detail. All of them ride the refresh-and-retry path in warble-core, so
//! a stale access token is invisible here.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use miette::Result;
use owo_colors::OwoColorize;
use warble_core::WarbleConfig;
use warble_core::models::{Task, TaskCreate};

use crate::helpers::{describe_api_error, get_tasks_client};
use crate::output::Output;

/// List tasks, pending-only by default.
pub async fn list(all: bool, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    let tasks = get_tasks_client(config).await?;
    let listing = tasks.list().await.map_err(describe_api_error)?;

    output.section("Tasks");
    if listing.calendar_imported {
        output.status("(includes imported calendar events)");
    }
    output.print("");

    let shown: Vec<&Task> = listing
        .tasks
        .iter()
        .filter(|t| all || !t.is_completed())
        .collect();

    if shown.is_empty() {
        if all {
            output.status("No tasks.");
        } else {
            output.status("No pending tasks. Use --all to include completed ones.");
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["", "ID", "Title", "Priority", "Due"]);

    for task in &shown {
        let mark = if task.is_completed() { "✓" } else { "" };
        table.add_row(vec![
            Cell::new(mark),
            Cell::new(&task.id),
            Cell::new(&task.title),
            Cell::new(&task.priority),
            Cell::new(task.due_date.as_deref().unwrap_or("-")),
        ]);
    }
    output.print(&table.to_string());

    output.print("");
    output.kv("Pending", &listing.pending_count.to_string());
    output.kv("Completed", &listing.completed_count.to_string());
    output.kv("Total", &listing.total_count.to_string());

    Ok(())
}

/// Create a task.
pub async fn add(
    title: &str,
    description: Option<String>,
    due: Option<String>,
    priority: Option<String>,
    config: &WarbleConfig,
) -> Result<()> {
    let output = Output::new();

    let tasks = get_tasks_client(config).await?;
    let task = tasks
        .create(&TaskCreate {
            title: title.to_string(),
            description,
            due_date: due,
            priority,
            status: None,
        })
        .await
        .map_err(describe_api_error)?;

    output.success(&format!("Created task {}", task.id.bright_green()));
    print_task(&output, &task);

    Ok(())
}

/// Show one task in detail.
pub async fn show(id: &str, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    let tasks = get_tasks_client(config).await?;
    let task = tasks.get(id).await.map_err(describe_api_error)?;

    output.section(&format!("Task {}", task.id.bright_cyan()));
    print_task(&output, &task);

    Ok(())
}

/// Toggle a task between pending and completed.
pub async fn done(id: &str, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    let tasks = get_tasks_client(config).await?;
    let task = tasks.toggle(id).await.map_err(describe_api_error)?;

    if task.is_completed() {
        output.success(&format!("Completed: {}", task.title));
    } else {
        output.success(&format!("Reopened: {}", task.title));
    }

    Ok(())
}

/// Delete a task.
pub async fn rm(id: &str, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    let tasks = get_tasks_client(config).await?;
    let deleted = tasks.delete(id).await.map_err(describe_api_error)?;

    output.success(&deleted.message);

    Ok(())
}

fn print_task(output: &Output, task: &Task) {
    output.kv("ID", &task.id);
    output.kv("Title", &task.title);
    output.kv("Status", &task.status);
    output.kv("Priority", &task.priority);
    if let Some(description) = &task.description {
        output.kv("Description", description);
    }
    if let Some(due) = &task.due_date {
        output.kv("Due", due);
    }
    if let Some(source) = &task.source {
        output.kv("Source", source);
    }
    if let Some(created) = &task.created_at {
        output.kv("Created", created);
    }
}
