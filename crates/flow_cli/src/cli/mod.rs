use clap::{Parser, Subcommand};
use flow_core::config::ConfigOverrides;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flow", author, version, about = "Tasks, notes and a focus timer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in to a local profile
    ///
    /// Example: flow login alice
    Login { name: String },
    /// Sign out of the current profile
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommand,
    },
    /// Run focus sessions
    Pomodoro {
        #[command(subcommand)]
        command: PomodoroCommand,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a new task
    ///
    /// Example: flow task add "Buy milk" --priority high --due "2026-10-20 18:00"
    Add {
        title: String,
        #[arg(long)]
        note: Option<String>,
        /// low, medium, high or urgent
        #[arg(short, long)]
        priority: Option<String>,
        /// RFC3339, "YYYY-MM-DD HH:MM[:SS]" or "YYYY-MM-DD"
        #[arg(long)]
        due: Option<String>,
    },
    /// Change fields of a task
    ///
    /// Example: flow task edit task-1 --title "Buy oat milk" --clear-due
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_note")]
        note: Option<String>,
        #[arg(long)]
        clear_note: bool,
        #[arg(short, long, conflicts_with = "clear_priority")]
        priority: Option<String>,
        #[arg(long)]
        clear_priority: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Mark a task done, or open again
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Show details of a task
    Show { id: String },
    /// List tasks, incomplete first, then by due date and priority
    ///
    /// Example: flow task list --filter today
    List {
        /// all, active, completed, today or overdue
        #[arg(long, default_value = "all")]
        filter: String,
    },
    /// Send desktop notifications for overdue tasks
    Notify,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Add a note
    Add { content: String },
    /// Replace a note's content
    ///
    /// Without CONTENT, lines read from stdin are autosaved until EOF.
    Edit { id: String, content: Option<String> },
    /// Mark a note done, or open again
    Toggle { id: String },
    /// Delete a note
    Delete { id: String },
    /// Show a note
    Show { id: String },
    /// List notes, most recently edited first
    List,
    /// Export all notes to a text or Word file
    ///
    /// Example: flow note export --format docx --output notes.docx
    Export {
        /// txt or docx
        #[arg(long, default_value = "txt")]
        format: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PomodoroCommand {
    /// Run a focus countdown and record it
    ///
    /// While it runs, type `p` (pause/resume), `r` (reset) or `m <minutes>`, then Enter.
    ///
    /// Example: flow pomodoro start --minutes 50 --task "Write report"
    Start {
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long, conflicts_with = "task_id")]
        task: Option<String>,
        #[arg(long)]
        task_id: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List finished sessions, newest first
    History,
    /// Delete the session history
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    /// Print the active theme
    Show,
    /// Switch between light and dark
    Toggle,
    /// Persist a theme by name
    Set { name: String },
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Alias(String),
    PomodoroMinutes,
    AutosaveDelayMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    let scalar = |target: ConfigOverrideTarget| {
        if remainder.is_some() {
            Err(format!("{canonical_field} override cannot have subfields"))
        } else {
            Ok(ParsedConfigOverride {
                target,
                value: value.clone(),
            })
        }
    };

    match canonical_field.as_str() {
        "theme" => scalar(ConfigOverrideTarget::Theme),
        "pomodoro_minutes" => scalar(ConfigOverrideTarget::PomodoroMinutes),
        "autosave_delay_ms" => scalar(ConfigOverrideTarget::AutosaveDelayMs),
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            Ok(ParsedConfigOverride {
                target: ConfigOverrideTarget::Alias(alias_name.to_string()),
                value,
            })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

/// Folds raw overrides into typed config overrides; later values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
            ConfigOverrideTarget::PomodoroMinutes => {
                let minutes = parsed
                    .value
                    .parse::<u32>()
                    .map_err(|_| format!("pomodoro_minutes must be a number: '{}'", parsed.value))?;
                overrides.pomodoro_minutes = Some(minutes);
            }
            ConfigOverrideTarget::AutosaveDelayMs => {
                let delay = parsed.value.parse::<u64>().map_err(|_| {
                    format!("autosave_delay_ms must be a number: '{}'", parsed.value)
                })?;
                overrides.autosave_delay_ms = Some(delay);
            }
        }
    }
    Ok(overrides)
}

/// Collects `--config-override` values ahead of clap so aliases can be
/// resolved before parsing.
pub fn scan_config_overrides(args: &[String]) -> Vec<String> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == CONFIG_OVERRIDE_FLAG {
            if let Some(value) = iter.next() {
                values.push(value.clone());
            }
        } else if let Some(value) = arg
            .strip_prefix(CONFIG_OVERRIDE_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            values.push(value.to_string());
        }
    }
    values
}

/// Replaces the first command word with its alias expansion. Built-in
/// command names are never shadowed.
pub fn expand_alias(
    args: Vec<String>,
    aliases: &HashMap<String, String>,
    builtins: &[&str],
) -> Result<Vec<String>, String> {
    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_str();
        if arg == CONFIG_OVERRIDE_FLAG {
            index += 2;
        } else if arg.starts_with('-') {
            index += 1;
        } else {
            break;
        }
    }

    let Some(word) = args.get(index) else {
        return Ok(args);
    };
    if builtins.contains(&word.as_str()) {
        return Ok(args);
    }
    let Some(expansion) = aliases.get(word) else {
        return Ok(args);
    };

    let replacement = split_command_line(expansion)?;
    if replacement.is_empty() {
        return Err(format!("alias '{word}' is empty"));
    }

    let mut expanded = Vec::with_capacity(args.len() + replacement.len());
    expanded.extend_from_slice(&args[..index]);
    expanded.extend(replacement);
    expanded.extend_from_slice(&args[index + 1..]);
    Ok(expanded)
}

pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;
    let mut quoted = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err("unterminated quote in command".to_string());
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
