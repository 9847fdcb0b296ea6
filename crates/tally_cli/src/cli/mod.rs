use clap::{Args, Parser, Subcommand};
use tally_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
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
    /// Manage tasks
    ///
    /// Example: tally task add "Buy milk"
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Manage income and expense transactions
    ///
    /// Example: tally tx add 12.50 --note lunch
    #[command(alias = "transaction")]
    Tx {
        #[command(subcommand)]
        command: TransactionCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a new task
    ///
    /// Example: tally task add "Buy milk" -d "2 litres"
    Add {
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// Edit a task's title or description
    ///
    /// Example: tally task edit 1734652800000 --title "Buy oat milk"
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },
    /// Flip a task between open and completed
    ///
    /// Example: tally task toggle 1734652800000
    Toggle { id: String },
    /// Move a task to the trash
    ///
    /// Example: tally task delete 1734652800000
    Delete { id: String },
    /// Bring a task back from the trash
    ///
    /// Example: tally task restore 1734652800000
    Restore { id: String },
    /// List tasks
    ///
    /// Example: tally task list
    /// Example: tally task list --trash
    List(ListArgs),
    /// Show details of a task
    ///
    /// Example: tally task show 1734652800000
    Show { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommand {
    /// Record a transaction (expense unless --income is given)
    ///
    /// Example: tally tx add 100 --income --note salary
    Add {
        amount: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, conflicts_with = "expense")]
        income: bool,
        #[arg(long)]
        expense: bool,
    },
    /// Edit a transaction's amount, note or type
    ///
    /// Example: tally tx edit 1734652800000 --amount 42 --kind income
    Edit {
        id: String,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, value_name = "income|expense")]
        kind: Option<String>,
    },
    /// Move a transaction to the trash
    ///
    /// Example: tally tx delete 1734652800000
    Delete { id: String },
    /// Bring a transaction back from the trash
    ///
    /// Example: tally tx restore 1734652800000
    Restore { id: String },
    /// List transactions
    ///
    /// Example: tally tx list --trash
    List(ListArgs),
    /// Show income, expense and balance of active transactions
    ///
    /// Example: tally tx tally
    Tally,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ListArgs {
    /// List trashed entries instead of active ones
    #[arg(long)]
    pub trash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Currency,
    LogLevel,
    Alias(String),
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

    let scalar = |target: ConfigOverrideTarget, name: &str| {
        if remainder.is_some() {
            Err(format!("{name} override cannot have subfields"))
        } else {
            Ok(ParsedConfigOverride {
                target,
                value: value.clone(),
            })
        }
    };

    match canonical_field.as_str() {
        "theme" => scalar(ConfigOverrideTarget::Theme, "theme"),
        "currency" => scalar(ConfigOverrideTarget::Currency, "currency"),
        "log_level" | "log" => scalar(ConfigOverrideTarget::LogLevel, "log_level"),
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

/// Folds every `--config-override` value into one set of overrides; later
/// values win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Currency => overrides.currency = Some(parsed.value),
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(parsed.value),
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
        }
    }
    Ok(overrides)
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
