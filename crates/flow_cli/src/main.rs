use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use flow_cli::cli::{
    Cli, Command, NoteCommand, PomodoroCommand, TaskCommand, ThemeCommand, collect_overrides,
    expand_alias, scan_config_overrides, split_command_line,
};
use flow_cli::render;
use flow_core::autosave::Autosaver;
use flow_core::config::{self, Config, Palette, merge_overrides, palette_for_theme};
use flow_core::datetime;
use flow_core::error::AppError;
use flow_core::model::{Note, Priority, Task};
use flow_core::note_api::ExportFormat;
use flow_core::notify::notifier_from_env;
use flow_core::pomodoro::timer::validate_minutes;
use flow_core::pomodoro::{SleepTicker, TimerControl};
use flow_core::pomodoro_api::{self, DEFAULT_TASK_NAME, SessionRequest};
use flow_core::task_api::{NewTask, TaskFilter, TaskPatch};
use flow_core::{logging, note_api, session, task_api};
use log::{info, warn};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};

const TIMER_CONTROLS_HINT: &str = "p: pause/resume, r: reset, m <minutes>: new duration (then Enter)";

struct Context<'a> {
    config: &'a Config,
    palette: Palette,
    json: bool,
    interactive: bool,
}

impl Context<'_> {
    fn say(&self, label: &str, subject: &str, id: &str) {
        println!(
            "{} {} {}",
            self.palette.accentize(label),
            subject,
            self.palette.mutedize(&format!("({id})"))
        );
    }
}

fn print_json(value: &Value) {
    println!("{value}");
}

fn print_task(ctx: &Context, label: &str, task: &Task) -> Result<(), AppError> {
    if ctx.json {
        print_json(&render::task_json(task)?);
    } else {
        ctx.say(label, &task.title, &task.id);
    }
    Ok(())
}

fn print_note(ctx: &Context, label: &str, note: &Note) -> Result<(), AppError> {
    if ctx.json {
        print_json(&serde_json::to_value(note)?);
    } else {
        ctx.say(label, note.title(), &note.id);
    }
    Ok(())
}

fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>, AppError> {
    raw.map(Priority::from_str).transpose()
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "login",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Task { .. } => "task",
        Command::Note { .. } => "note",
        Command::Pomodoro { .. } => "pomodoro",
        Command::Theme { .. } => "theme",
    }
}

fn run_task_command(ctx: &Context, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add {
            title,
            note,
            priority,
            due,
        } => {
            let new_task = NewTask {
                title,
                note,
                priority: parse_priority(priority.as_deref())?,
                due,
            };
            let task = task_api::add_task(&new_task)?;
            print_task(ctx, "Added task:", &task)?;
        }
        TaskCommand::Edit {
            id,
            title,
            note,
            clear_note,
            priority,
            clear_priority,
            due,
            clear_due,
        } => {
            let patch = TaskPatch {
                title,
                note: if clear_note { Some(None) } else { note.map(Some) },
                priority: if clear_priority {
                    Some(None)
                } else {
                    parse_priority(priority.as_deref())?.map(Some)
                },
                due: if clear_due { Some(None) } else { due.map(Some) },
            };
            let task = task_api::update_task(&id, &patch)?;
            print_task(ctx, "Updated task:", &task)?;
        }
        TaskCommand::Toggle { id } => {
            let task = task_api::toggle_task(&id)?;
            let label = if task.completed {
                "Completed task:"
            } else {
                "Reopened task:"
            };
            print_task(ctx, label, &task)?;
        }
        TaskCommand::Delete { id } => {
            let task = task_api::delete_task(&id)?;
            print_task(ctx, "Deleted task:", &task)?;
        }
        TaskCommand::Show { id } => {
            let task = task_api::get_task(&id)?;
            if ctx.json {
                print_json(&render::task_json(&task)?);
            } else {
                println!("{}", render::task_detail(&task)?);
            }
        }
        TaskCommand::List { filter } => {
            let filter = TaskFilter::from_str(&filter)?;
            let tasks = task_api::list_tasks(filter)?;
            if ctx.json {
                print_json(&render::tasks_json(&tasks)?);
            } else if tasks.is_empty() {
                println!("{}", ctx.palette.mutedize("No tasks"));
            } else {
                println!("{}", render::tasks_table(&tasks)?);
            }
        }
        TaskCommand::Notify => {
            let outcome = task_api::notify_overdue()?;
            for failure in &outcome.failures {
                eprintln!("WARN: failed to notify {}: {}", failure.task_id, failure.error);
            }
            if ctx.json {
                print_json(&render::tasks_json(&outcome.tasks)?);
            } else if outcome.tasks.is_empty() && outcome.failures.is_empty() {
                println!("{}", ctx.palette.mutedize("No overdue tasks"));
            } else {
                for task in &outcome.tasks {
                    ctx.say("Notified task:", &task.title, &task.id);
                }
            }
            if outcome.tasks.is_empty() && !outcome.failures.is_empty() {
                return Err(AppError::io("no notification could be delivered"));
            }
        }
    }

    Ok(())
}

/// Streams stdin lines into the autosaver until EOF.
fn edit_note_from_stdin(ctx: &Context, id: &str) -> Result<(usize, Note), AppError> {
    if ctx.interactive {
        return Err(AppError::invalid_input(
            "content is required in interactive mode",
        ));
    }

    let note_id = note_api::get_note(id)?.id;
    let target = note_id.clone();
    let mut autosaver = Autosaver::spawn(ctx.config.autosave_delay(), move |content| {
        note_api::edit_note(&target, content).map(|_| ())
    });

    let mut buffer = String::new();
    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        if index > 0 {
            buffer.push('\n');
        }
        buffer.push_str(&line);
        autosaver.update(buffer.clone())?;
    }

    let saves = autosaver.finish()?;
    info!("event=note_autosave id={} saves={}", note_id, saves);
    Ok((saves, note_api::get_note(&note_id)?))
}

fn run_note_command(ctx: &Context, command: NoteCommand) -> Result<(), AppError> {
    match command {
        NoteCommand::Add { content } => {
            let note = note_api::add_note(&content)?;
            print_note(ctx, "Added note:", &note)?;
        }
        NoteCommand::Edit {
            id,
            content: Some(content),
        } => {
            let note = note_api::edit_note(&id, &content)?;
            print_note(ctx, "Updated note:", &note)?;
        }
        NoteCommand::Edit { id, content: None } => {
            let (saves, note) = edit_note_from_stdin(ctx, &id)?;
            if saves == 0 && !ctx.json {
                println!("{}", ctx.palette.mutedize("No changes saved"));
            } else {
                print_note(ctx, "Updated note:", &note)?;
            }
        }
        NoteCommand::Toggle { id } => {
            let note = note_api::toggle_note(&id)?;
            let label = if note.completed {
                "Completed note:"
            } else {
                "Reopened note:"
            };
            print_note(ctx, label, &note)?;
        }
        NoteCommand::Delete { id } => {
            let note = note_api::delete_note(&id)?;
            print_note(ctx, "Deleted note:", &note)?;
        }
        NoteCommand::Show { id } => {
            let note = note_api::get_note(&id)?;
            if ctx.json {
                print_json(&serde_json::to_value(&note)?);
            } else {
                println!("{}", render::note_detail(&note, &ctx.palette));
            }
        }
        NoteCommand::List => {
            let notes = note_api::list_notes()?;
            if ctx.json {
                print_json(&serde_json::to_value(&notes)?);
            } else if notes.is_empty() {
                println!("{}", ctx.palette.mutedize("No notes"));
            } else {
                println!("{}", render::notes_table(&notes));
            }
        }
        NoteCommand::Export { format, output } => {
            let format = ExportFormat::from_str(&format)?;
            let export = note_api::export_notes(format)?;
            let path = output.unwrap_or_else(|| PathBuf::from(&export.file_name));
            std::fs::write(&path, &export.bytes)
                .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
            info!(
                "event=note_export_written count={} path={}",
                export.count,
                path.display()
            );
            if ctx.json {
                print_json(&serde_json::json!({
                    "path": path.display().to_string(),
                    "format": export.format.extension(),
                    "count": export.count,
                }));
            } else {
                println!(
                    "{} {} notes to {}",
                    ctx.palette.accentize("Exported"),
                    export.count,
                    path.display()
                );
            }
        }
    }

    Ok(())
}

/// Reads timer control lines from stdin on a background thread. The REPL owns
/// stdin in interactive mode, so there the channel is closed from the start.
fn timer_controls(ctx: &Context) -> Receiver<TimerControl> {
    let (sender, receiver) = mpsc::channel();
    if ctx.interactive {
        return receiver;
    }

    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match TimerControl::from_str(&line) {
                Ok(control) => {
                    if sender.send(control).is_err() {
                        break;
                    }
                }
                Err(err) => eprintln!("\nWARN: {err}"),
            }
        }
    });
    receiver
}

fn run_pomodoro_command(ctx: &Context, command: PomodoroCommand) -> Result<(), AppError> {
    match command {
        PomodoroCommand::Start {
            minutes,
            task,
            task_id,
            note,
        } => {
            let task_name = match task_id {
                Some(id) => Some(pomodoro_api::task_name_for(&id)?),
                None => task,
            };
            let request = SessionRequest {
                minutes: minutes.unwrap_or_else(|| ctx.config.pomodoro_minutes()),
                task_name,
                note,
            };
            let label = request
                .task_name
                .clone()
                .unwrap_or_else(|| DEFAULT_TASK_NAME.to_string());
            validate_minutes(request.minutes)?;
            let notifier = notifier_from_env()?;
            let mut ticker = SleepTicker::default();
            let show_progress = !ctx.json;
            let controls = timer_controls(ctx);
            if show_progress && !ctx.interactive {
                println!("{}", ctx.palette.mutedize(TIMER_CONTROLS_HINT));
            }

            let session = pomodoro_api::run_session(
                &request,
                &mut ticker,
                &controls,
                notifier.as_ref(),
                |countdown| {
                    if show_progress {
                        print!(
                            "\r{}",
                            render::countdown_line(countdown, &label, &ctx.palette)
                        );
                        io::stdout().flush().ok();
                    }
                },
            )?;

            if ctx.json {
                print_json(&serde_json::to_value(&session)?);
            } else {
                println!();
                println!(
                    "{} {} ({} min)",
                    ctx.palette.accentize("Time's up!"),
                    session.task_name,
                    session.duration_minutes
                );
            }
        }
        PomodoroCommand::History => {
            let sessions = pomodoro_api::history()?;
            if ctx.json {
                print_json(&serde_json::to_value(&sessions)?);
            } else if sessions.is_empty() {
                println!("{}", ctx.palette.mutedize("No sessions"));
            } else {
                println!("{}", render::sessions_table(&sessions));
            }
        }
        PomodoroCommand::Clear => {
            let removed = pomodoro_api::clear_history()?;
            if ctx.json {
                print_json(&serde_json::json!({ "removed": removed }));
            } else {
                println!("Cleared {removed} sessions");
            }
        }
    }

    Ok(())
}

fn print_theme(ctx: &Context, label: &str, theme: &str) {
    if ctx.json {
        print_json(&serde_json::json!({ "theme": theme }));
    } else {
        let palette = palette_for_theme(Some(theme));
        println!("{} {}", label, palette.accentize(theme));
    }
}

fn run_command(cli: Cli, config: &Config, interactive: bool) -> Result<(), AppError> {
    let ctx = Context {
        config,
        palette: palette_for_theme(config.theme.as_deref()),
        json: cli.json,
        interactive,
    };
    info!("event=command name={}", command_name(&cli.command));

    match cli.command {
        Command::Login { name } => {
            let session = session::login(&name)?;
            if ctx.json {
                print_json(&serde_json::to_value(&session)?);
            } else {
                println!("Signed in as {}", ctx.palette.accentize(&session.user));
            }
        }
        Command::Logout => match session::logout()? {
            Some(session) if !ctx.json => println!("Signed out {}", session.user),
            Some(session) => print_json(&serde_json::to_value(&session)?),
            None if !ctx.json => println!("{}", ctx.palette.mutedize("Not signed in")),
            None => print_json(&Value::Null),
        },
        Command::Whoami => {
            let user = session::current_user()?.ok_or_else(|| {
                AppError::unauthenticated("not signed in; run `flow login <name>`")
            })?;
            if ctx.json {
                print_json(&serde_json::json!({ "user": user }));
            } else {
                println!("{user}");
            }
        }
        Command::Task { command } => run_task_command(&ctx, command)?,
        Command::Note { command } => run_note_command(&ctx, command)?,
        Command::Pomodoro { command } => run_pomodoro_command(&ctx, command)?,
        Command::Theme { command } => match command {
            ThemeCommand::Show => {
                let theme = config.theme.as_deref().unwrap_or("default");
                print_theme(&ctx, "Theme:", theme);
            }
            ThemeCommand::Toggle => {
                let theme = config::toggle_theme()?;
                print_theme(&ctx, "Theme set to", &theme);
            }
            ThemeCommand::Set { name } => {
                let theme = config::set_theme(&name)?;
                print_theme(&ctx, "Theme set to", &theme);
            }
        },
    }

    Ok(())
}

/// Applies overrides and aliases, parses, and runs one command line.
/// `Ok` without running means clap already printed help or version.
fn run_args(args: Vec<String>, base: &Config, interactive: bool) -> Result<(), AppError> {
    let overrides =
        collect_overrides(&scan_config_overrides(&args)).map_err(AppError::invalid_input)?;
    let config = merge_overrides(base, &overrides);

    let command = Cli::command();
    let mut builtins: Vec<&str> = command.get_subcommands().map(|sub| sub.get_name()).collect();
    builtins.push("help");
    let args = expand_alias(args, &config.aliases, &builtins).map_err(AppError::invalid_input)?;

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("flow".to_string());
    argv.extend(args);

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(normalize_parse_error(err)),
    };

    run_command(cli, &config, interactive)
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", AppError::invalid_input(err));
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        if let Err(err) = run_args(args, config, true) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let level = match logging::resolve_level(config.log_level.as_deref()) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("WARN: {err}");
            logging::default_log_level()
        }
    };
    if let Err(err) = logging::log_dir().and_then(|dir| logging::init_logging(level, &dir)) {
        eprintln!("WARN: logging disabled: {err}");
    }
}

fn main() {
    datetime::local_offset();
    let loaded = config::load_config_with_fallback();
    init_logging(&loaded.config);
    if let Some(err) = &loaded.error {
        warn!("event=config_load status=error error={}", err);
        eprintln!("WARN: {err}; using defaults");
    }

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let result = if args.is_empty() {
        run_interactive(&loaded.config)
    } else {
        run_args(args, &loaded.config, false)
    };

    if let Err(err) = result {
        warn!("event=command status=error code={}", err.code());
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
