//! taskdeck: a deadline-first personal task list.
//!
//! Thin presentation layer: clap parses the surface, handlers translate
//! into repository and preference calls, renderers in `format` produce the
//! output. All domain rules live in the library crate.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use taskdeck::cli::{
    AddArgs, Cli, Command, EditArgs, FocusArgs, FocusCommand, ListArgs, ShowArgs, SubtaskCommand,
    WatchArgs,
};
use taskdeck::db::Store;
use taskdeck::db::watcher::start_store_watcher;
use taskdeck::editor::TaskEditor;
use taskdeck::prefs::PrefStore;
use taskdeck::repo::TaskRepository;
use taskdeck::types::{FilterState, Task, TaskWithSubtasks};
use taskdeck::{focus, format, paths, triage};
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(paths::default_database_path);
    let prefs_path = cli.prefs.clone().unwrap_or_else(paths::default_prefs_path);
    paths::ensure_parent_dir(&db_path)?;
    debug!(
        database = %db_path.display(),
        prefs = %prefs_path.display(),
        "opening stores"
    );

    let store = Store::open(&db_path)?;
    let prefs = PrefStore::open(prefs_path);
    let repo = TaskRepository::new(store.clone());

    match cli.command.unwrap_or(Command::List(ListArgs::default())) {
        Command::Add(args) => run_add(&store, args),
        Command::Edit(args) => run_edit(&store, args),
        Command::List(args) => run_list(&repo, &prefs, args),
        Command::Show(args) => run_show(&repo, &store, args),
        Command::Done { id } => run_done(&repo, &store, &id),
        Command::Undone { id } => run_undone(&repo, &store, &id),
        Command::Delete { id } => run_delete(&repo, &store, &id),
        Command::Dismiss { id } => run_dismiss(&repo, &store, &id),
        Command::Reschedule { id, date } => run_reschedule(&repo, &store, &id, date),
        Command::Subtask(command) => run_subtask(&repo, &store, command),
        Command::Focus(args) => run_focus(&repo, &store, &prefs, args),
        Command::Watch(args) => run_watch(&repo, &store, &prefs, &db_path, args).await,
    }
}

/// Initialize logging based on the --log option.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Expand a possibly-shortened task id to the unique full id it prefixes.
fn resolve_task_id(store: &Store, input: &str) -> Result<String> {
    let matches = store.find_task_ids_by_prefix(input)?;
    match matches.as_slice() {
        [] => bail!("no task matches '{input}'"),
        [id] => Ok(id.clone()),
        more => bail!("'{input}' is ambiguous: {} tasks match", more.len()),
    }
}

fn resolve_subtask_id(store: &Store, input: &str) -> Result<String> {
    let matches = store.find_subtask_ids_by_prefix(input)?;
    match matches.as_slice() {
        [] => bail!("no subtask matches '{input}'"),
        [id] => Ok(id.clone()),
        more => bail!("'{input}' is ambiguous: {} subtasks match", more.len()),
    }
}

fn run_add(store: &Store, args: AddArgs) -> Result<()> {
    let mut editor = TaskEditor::new(store.clone());
    editor.title = args.title;
    editor.description = args.notes.unwrap_or_default();
    editor.soft_deadline = args.soft;
    editor.hard_deadline = args.hard;
    for title in &args.subtasks {
        editor.add_subtask_entry(title);
    }
    if editor.subtask_count_warning() {
        eprintln!("note: that is a lot of subtasks; consider splitting the task");
    }
    let id = editor.save(&Local)?;
    println!("Added task {id}");
    Ok(())
}

fn run_edit(store: &Store, args: EditArgs) -> Result<()> {
    let id = resolve_task_id(store, &args.id)?;
    let mut editor = TaskEditor::edit(store.clone(), &id, &Local)?;
    if let Some(title) = args.title {
        editor.title = title;
    }
    if let Some(notes) = args.notes {
        editor.description = notes;
    }
    if args.clear_notes {
        editor.description.clear();
    }
    if let Some(date) = args.soft {
        editor.soft_deadline = Some(date);
    }
    if args.clear_soft {
        editor.soft_deadline = None;
    }
    if let Some(date) = args.hard {
        editor.hard_deadline = Some(date);
    }
    if args.clear_hard {
        editor.hard_deadline = None;
    }
    let id = editor.save(&Local)?;
    println!("Updated task {id}");
    Ok(())
}

fn run_list(repo: &TaskRepository, prefs: &PrefStore, args: ListArgs) -> Result<()> {
    if let Some(sort) = args.sort {
        prefs.set_sort_option(sort.into())?;
    }
    let filter = args.filter_state();
    let sort = prefs.current().sort_option;
    let now = Local::now();
    let view = triage::triage(
        &repo.active_tasks()?,
        &repo.recently_completed()?,
        &filter,
        sort,
        &now,
    );
    if args.json {
        println!("{}", format::render_json(&view)?);
    } else {
        let progress = format::progress_by_task(&repo.store().all_subtasks_ordered()?);
        print!("{}", format::render_triage_text(&view, &progress, &now));
    }
    Ok(())
}

fn run_show(repo: &TaskRepository, store: &Store, args: ShowArgs) -> Result<()> {
    let id = resolve_task_id(store, &args.id)?;
    let entry = repo
        .task_with_subtasks(&id)?
        .with_context(|| format!("no task matches '{}'", args.id))?;
    if args.json {
        println!("{}", format::render_json(&entry)?);
    } else {
        print!("{}", format::render_task_detail(&entry, &Local::now()));
    }
    Ok(())
}

fn run_done(repo: &TaskRepository, store: &Store, input: &str) -> Result<()> {
    let id = resolve_task_id(store, input)?;
    repo.complete_task(&id)?;
    println!("Completed {id}");
    Ok(())
}

fn run_undone(repo: &TaskRepository, store: &Store, input: &str) -> Result<()> {
    let id = resolve_task_id(store, input)?;
    repo.uncomplete_task(&id)?;
    println!("Reopened {id}");
    Ok(())
}

fn run_delete(repo: &TaskRepository, store: &Store, input: &str) -> Result<()> {
    let id = resolve_task_id(store, input)?;
    repo.delete_task(&id)?;
    println!("Deleted {id}");
    Ok(())
}

fn run_dismiss(repo: &TaskRepository, store: &Store, input: &str) -> Result<()> {
    let id = resolve_task_id(store, input)?;
    repo.dismiss_overdue(&id)?;
    println!("Dismissed {id}");
    Ok(())
}

fn run_reschedule(
    repo: &TaskRepository,
    store: &Store,
    input: &str,
    date: chrono::NaiveDate,
) -> Result<()> {
    let id = resolve_task_id(store, input)?;
    repo.reschedule_task(&id, date, &Local)?;
    println!("Rescheduled {id} to {date}");
    Ok(())
}

fn run_subtask(repo: &TaskRepository, store: &Store, command: SubtaskCommand) -> Result<()> {
    match command {
        SubtaskCommand::Add { task_id, title } => {
            let task_id = resolve_task_id(store, &task_id)?;
            let subtask = repo.add_subtask(&task_id, &title)?;
            println!("Added subtask {}", subtask.id);
        }
        SubtaskCommand::Done { subtask_id } => {
            let id = resolve_subtask_id(store, &subtask_id)?;
            repo.toggle_subtask(&id)?;
            println!("Toggled subtask {id}");
        }
        SubtaskCommand::Rm { subtask_id } => {
            let id = resolve_subtask_id(store, &subtask_id)?;
            repo.delete_subtask(&id)?;
            println!("Removed subtask {id}");
        }
        SubtaskCommand::Move { subtask_id, index } => {
            let id = resolve_subtask_id(store, &subtask_id)?;
            let subtask = store
                .get_subtask(&id)?
                .with_context(|| format!("no subtask matches '{subtask_id}'"))?;
            let ordered = repo.subtasks(&subtask.task_id)?;
            repo.reorder_subtask(&id, index, &ordered)?;
            println!("Moved subtask {id} to index {index}");
        }
    }
    Ok(())
}

fn run_focus(
    repo: &TaskRepository,
    store: &Store,
    prefs: &PrefStore,
    args: FocusArgs,
) -> Result<()> {
    match args.command {
        Some(FocusCommand::Pin { id }) => {
            let id = resolve_task_id(store, &id)?;
            if !prefs.current().focus_pinned_task_ids.contains(&id) {
                prefs.toggle_pin(&id)?;
            }
            println!("Pinned {id}");
        }
        Some(FocusCommand::Unpin { id }) => {
            // Resolved against the pin set itself so pins left behind by a
            // deleted task can still be released.
            let pinned = prefs.current().focus_pinned_task_ids;
            let matches: Vec<&String> = pinned.iter().filter(|p| p.starts_with(&id)).collect();
            match matches.as_slice() {
                [] => bail!("no pinned task matches '{id}'"),
                [full] => {
                    let full = (*full).clone();
                    prefs.toggle_pin(&full)?;
                    println!("Unpinned {full}");
                }
                more => bail!("'{id}' is ambiguous: {} pinned tasks match", more.len()),
            }
        }
        Some(FocusCommand::Limit { n }) => {
            prefs.set_focus_task_limit(n)?;
            println!("Focus limit set to {}", prefs.current().focus_task_limit);
        }
        None => {
            let now = Local::now();
            let current = prefs.current();
            let view = focus::focus_view(
                &repo.active_tasks()?,
                current.focus_task_limit,
                &current.focus_pinned_task_ids,
                &now,
            );
            if args.json {
                println!("{}", format::render_json(&view)?);
            } else {
                print!("{}", format::render_focus_text(&view, &now));
            }
        }
    }
    Ok(())
}

/// Live view loop: re-render whenever the store or preferences change,
/// until Ctrl-C. A file watcher folds in changes from other processes; if
/// it cannot start, in-process changes still refresh.
async fn run_watch(
    repo: &TaskRepository,
    store: &Store,
    prefs: &PrefStore,
    db_path: &Path,
    args: WatchArgs,
) -> Result<()> {
    let _watcher = match start_store_watcher(store.clone(), db_path) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("file watcher unavailable, external edits will not refresh: {e}");
            None
        }
    };
    let mut prefs_rx = prefs.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if args.focus {
        let mut live = repo.observe_active_tasks();
        render_focus_frame(&live.current(), prefs);
        loop {
            tokio::select! {
                changed = live.changed() => {
                    if !changed { break; }
                }
                res = prefs_rx.changed() => {
                    if res.is_err() { break; }
                }
                _ = &mut ctrl_c => break,
            }
            render_focus_frame(&live.current(), prefs);
        }
    } else {
        let mut active = repo.observe_active_with_subtasks();
        let mut recent = repo.observe_recently_completed();
        render_triage_frame(&active.current(), &recent.current(), prefs);
        loop {
            tokio::select! {
                changed = active.changed() => {
                    if !changed { break; }
                }
                changed = recent.changed() => {
                    if !changed { break; }
                }
                res = prefs_rx.changed() => {
                    if res.is_err() { break; }
                }
                _ = &mut ctrl_c => break,
            }
            render_triage_frame(&active.current(), &recent.current(), prefs);
        }
    }
    Ok(())
}

fn render_triage_frame(entries: &[TaskWithSubtasks], recent: &[Task], prefs: &PrefStore) {
    let now = Local::now();
    let tasks: Vec<Task> = entries.iter().map(|e| e.task.clone()).collect();
    let mut progress = HashMap::new();
    for entry in entries {
        if entry.has_subtasks() {
            progress.insert(
                entry.task.id.clone(),
                (entry.completed_subtask_count(), entry.total_subtask_count()),
            );
        }
    }
    let view = triage::triage(
        &tasks,
        recent,
        &FilterState::default(),
        prefs.current().sort_option,
        &now,
    );
    print!(
        "\x1b[2J\x1b[H{}",
        format::render_triage_text(&view, &progress, &now)
    );
    let _ = std::io::stdout().flush();
}

fn render_focus_frame(tasks: &[Task], prefs: &PrefStore) {
    let now = Local::now();
    let current = prefs.current();
    let view = focus::focus_view(
        tasks,
        current.focus_task_limit,
        &current.focus_pinned_task_ids,
        &now,
    );
    print!("\x1b[2J\x1b[H{}", format::render_focus_text(&view, &now));
    let _ = std::io::stdout().flush();
}
