use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::app::App;
use crate::category::HOME;
use crate::cli::{CategoryCommand, Command};
use crate::render::Renderer;

#[instrument(skip(app, renderer, command))]
pub fn dispatch(app: &mut App, renderer: &mut Renderer, command: Command) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::List { category } => cmd_list(app, renderer, category.as_deref()),
        Command::Add { title, category } => cmd_add(app, &title, category.as_deref()),
        Command::Show { task } => cmd_show(app, renderer, &task),
        Command::Edit {
            task,
            title,
            category,
            completed,
        } => cmd_edit(app, &task, title, category, completed),
        Command::Toggle { task } => cmd_toggle(app, &task),
        Command::Delete { task } => cmd_delete(app, &task),
        Command::Clear { yes } => cmd_clear(app, yes),
        Command::Categories => renderer.print_categories(app.categories()),
        Command::Category(args) => match args.command {
            CategoryCommand::Add { name, icon, color } => {
                cmd_category_add(app, &name, icon.as_deref(), color.as_deref())
            }
        },
        Command::Export { path } => {
            let count = app
                .export(&path)
                .with_context(|| format!("failed to export to {}", path.display()))?;
            println!("Exported {count} task(s) to {}.", path.display());
            Ok(())
        }
        Command::Import { path, mode } => {
            let count = app
                .import(&path, mode)
                .with_context(|| format!("failed to import from {}", path.display()))?;
            println!("Imported {count} task(s).");
            Ok(())
        }
        Command::Save => {
            app.save()?;
            println!("Saved.");
            Ok(())
        }
    }
}

#[instrument(skip(app, renderer))]
fn cmd_list(app: &mut App, renderer: &mut Renderer, category: Option<&str>) -> anyhow::Result<()> {
    info!("command list");

    app.select_category(category.unwrap_or(HOME));
    renderer.print_task_list(app.selected_category(), &app.visible_tasks(), app.categories())
}

#[instrument(skip(app, title))]
fn cmd_add(app: &mut App, title: &[String], category: Option<&str>) -> anyhow::Result<()> {
    info!("command add");

    let title = title.join(" ");
    let id = app.add_task(&title, category)?;
    println!("Created task {}.", current_short(app, id));
    Ok(())
}

#[instrument(skip(app, renderer))]
fn cmd_show(app: &mut App, renderer: &mut Renderer, reference: &str) -> anyhow::Result<()> {
    info!("command show");

    let id = app.resolve(reference)?;
    let task = app
        .task(id)
        .ok_or_else(|| anyhow!("task vanished: {reference}"))?;
    renderer.print_task_info(task, app.categories())
}

#[instrument(skip(app))]
fn cmd_edit(
    app: &mut App,
    reference: &str,
    title: Option<String>,
    category: Option<String>,
    completed: Option<bool>,
) -> anyhow::Result<()> {
    info!("command edit");

    let id = app.resolve(reference)?;
    let current = app
        .task(id)
        .cloned()
        .ok_or_else(|| anyhow!("task vanished: {reference}"))?;

    let title = title.unwrap_or(current.title);
    let category = category.unwrap_or(current.category);
    let completed = completed.unwrap_or(current.completed);
    app.update_task(id, &title, &category, completed)?;

    println!("Modified task {}.", current_short(app, id));
    Ok(())
}

#[instrument(skip(app))]
fn cmd_toggle(app: &mut App, reference: &str) -> anyhow::Result<()> {
    info!("command toggle");

    let id = app.resolve(reference)?;
    let completed = app.toggle_completed(id)?;
    let state = if completed { "completed" } else { "open" };
    println!("Task {} is now {state}.", current_short(app, id));
    Ok(())
}

#[instrument(skip(app))]
fn cmd_delete(app: &mut App, reference: &str) -> anyhow::Result<()> {
    info!("command delete");

    let id = app.resolve(reference)?;
    let removed = app.delete_task(id)?;
    println!("Deleted task {} '{}'.", removed.short_id(), removed.title);
    Ok(())
}

#[instrument(skip(app))]
fn cmd_clear(app: &mut App, yes: bool) -> anyhow::Result<()> {
    info!("command clear");

    if !yes {
        return Err(anyhow!(
            "clear removes every task and cannot be undone; pass --yes to confirm"
        ));
    }
    let removed = app.clear_all()?;
    println!("Cleared {removed} task(s).");
    Ok(())
}

#[instrument(skip(app))]
fn cmd_category_add(
    app: &mut App,
    name: &str,
    icon: Option<&str>,
    color: Option<&str>,
) -> anyhow::Result<()> {
    info!("command category add");

    app.add_category(name, icon, color)?;
    println!("Created category {}.", name.trim());
    Ok(())
}

fn current_short(app: &App, id: uuid::Uuid) -> String {
    app.task(id)
        .map(|task| task.short_id())
        .unwrap_or_else(|| id.to_string())
}
