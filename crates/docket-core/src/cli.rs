use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::app::ImportMode;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "docket",
    version,
    about = "Docket: a personal to-do list with categories",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "docketrc")]
    pub docketrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the tasks of a category (Home shows everything).
    List {
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
    },
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
    },
    /// Show one task in detail.
    Show { task: String },
    /// Change a task's title, category or completion flag.
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        #[arg(long, action = ArgAction::Set)]
        completed: Option<bool>,
    },
    /// Flip a task between open and completed.
    #[command(visible_alias = "done")]
    Toggle { task: String },
    /// Delete a task.
    Delete { task: String },
    /// Delete every task.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// List categories with their task counts.
    Categories,
    /// Manage categories.
    Category(CategoryArgs),
    /// Write all tasks to a JSON file.
    Export { path: PathBuf },
    /// Read tasks from a JSON file.
    Import {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = ImportMode::Merge)]
        mode: ImportMode,
    },
    /// Write both data files now.
    Save,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
}

impl Command {
    /// Command used when none is given, from the `default.command` key.
    pub fn from_default(name: &str) -> anyhow::Result<Self> {
        match name.trim() {
            "list" => Ok(Self::List { category: None }),
            "categories" => Ok(Self::Categories),
            other => Err(anyhow!(
                "default.command must be list or categories, got: {other}"
            )),
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` / `rc.key:value` arguments out before clap sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args};
    use crate::app::ImportMode;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&[
            "docket",
            "rc.color=off",
            "add",
            "rc.default.category:Work",
            "Buy milk",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, args(&["docket", "add", "Buy milk"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.default.category".to_string(), "Work".to_string()),
            ]
        );
    }

    #[test]
    fn add_joins_title_words_later() {
        let cli = GlobalCli::parse_from(["docket", "add", "Write", "report", "-c", "Work"]);
        match cli.command {
            Some(Command::Add { title, category }) => {
                assert_eq!(title, vec!["Write", "report"]);
                assert_eq!(category.as_deref(), Some("Work"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn import_defaults_to_merge() {
        let cli = GlobalCli::parse_from(["docket", "import", "tasks.json"]);
        match cli.command {
            Some(Command::Import { mode, .. }) => assert_eq!(mode, ImportMode::Merge),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = GlobalCli::parse_from(["docket", "import", "t.json", "--mode", "replace"]);
        assert!(matches!(
            cli.command,
            Some(Command::Import {
                mode: ImportMode::Replace,
                ..
            })
        ));
    }

    #[test]
    fn done_is_an_alias_for_toggle() {
        let cli = GlobalCli::parse_from(["docket", "done", "abcd1234"]);
        assert!(matches!(cli.command, Some(Command::Toggle { task }) if task == "abcd1234"));
    }

    #[test]
    fn default_command_names() {
        assert!(matches!(
            Command::from_default("list").expect("list"),
            Command::List { category: None }
        ));
        assert!(Command::from_default("next").is_err());
    }
}
