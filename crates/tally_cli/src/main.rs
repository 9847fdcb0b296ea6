use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use tally_cli::cli::{Cli, Command, ListArgs, TaskCommand, TransactionCommand, collect_config_overrides};
use tally_cli::render;
use tally_core::config::{Config, load_config_with_fallback, merge_overrides};
use tally_core::error::AppError;
use tally_core::model::{
    TaskDraft, TaskPatch, TransactionDraft, TransactionKind, TransactionPatch,
};
use tally_core::state::Filter;
use tally_core::storage::JsonFileSlots;
use tally_core::tasks::TaskAction;
use tally_core::transactions::{self, TransactionAction};
use tally_core::{TaskStore, TransactionStore};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TALLY_LOG";

/// Both stores, opened once and owned for the whole process.
struct Session {
    config: Config,
    tasks: TaskStore<JsonFileSlots>,
    transactions: TransactionStore<JsonFileSlots>,
}

impl Session {
    fn open(config: Config) -> Result<Self, AppError> {
        let slots = JsonFileSlots::from_env()?;
        tracing::debug!(dir = %slots.dir().display(), "opening stores");
        Ok(Self {
            config,
            tasks: TaskStore::open(slots.clone()),
            transactions: TransactionStore::open(slots),
        })
    }
}

fn init_logging(config: &Config) {
    let fallback = config.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn required_title(title: Option<&str>) -> Result<String, AppError> {
    match title.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::invalid_input("title is required")),
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn parse_amount(raw: Option<&str>) -> Result<String, AppError> {
    let trimmed = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AppError::invalid_input("amount is required")),
    };

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(trimmed.to_string()),
        _ => Err(AppError::invalid_input(
            "amount must be a non-negative number",
        )),
    }
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn filter_for(args: ListArgs) -> Filter {
    if args.trash {
        Filter::Trashed
    } else {
        Filter::Active
    }
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

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

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
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn effective_config(base: &Config, raw_overrides: &[String]) -> Result<Config, AppError> {
    if raw_overrides.is_empty() {
        return Ok(base.clone());
    }
    let overrides = collect_config_overrides(raw_overrides).map_err(AppError::invalid_input)?;
    Ok(merge_overrides(base, &overrides))
}

fn run_command(session: &mut Session, cli: Cli) -> Result<(), AppError> {
    let config = effective_config(&session.config, &cli.config_override)?;
    match cli.command {
        Command::Task { command } => run_task_command(session, &config, command, cli.json),
        Command::Tx { command } => run_transaction_command(session, &config, command, cli.json),
    }
}

fn run_task_command(
    session: &mut Session,
    config: &Config,
    command: TaskCommand,
    json: bool,
) -> Result<(), AppError> {
    let palette = config.palette();
    let store = &mut session.tasks;

    let ensure_known = |store: &TaskStore<JsonFileSlots>, id: &str| -> Result<String, AppError> {
        let id = required_id(id)?;
        if store.state().contains(id) {
            Ok(id.to_string())
        } else {
            Err(AppError::invalid_input("task not found"))
        }
    };

    let print_task = |store: &TaskStore<JsonFileSlots>, id: &str, verb: &str| {
        let state = store.state();
        if let Some(task) = state.get(id) {
            if json {
                println!("{}", render::task_json(id, task, state.status_of(id)));
            } else {
                println!("{verb}: {} ({id})", task.title);
            }
        }
    };

    match command {
        TaskCommand::Add { title, description } => {
            let title = required_title(title.as_deref())?;
            let mut draft = TaskDraft::new(title);
            draft.description = optional_text(description);

            let outcome = store.dispatch(TaskAction::Create(draft))?;
            let id = outcome
                .created
                .ok_or_else(|| AppError::invalid_data("task was not created"))?;
            print_task(store, &id, "Added task");
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            clear_description,
        } => {
            let id = ensure_known(store, &id)?;
            let mut patch = TaskPatch::default();
            if title.is_some() {
                patch.title = Some(required_title(title.as_deref())?);
            }
            if clear_description {
                patch.description = Some(None);
            } else if description.is_some() {
                patch.description = Some(optional_text(description));
            }
            if patch.is_empty() {
                return Err(AppError::invalid_input("nothing to update"));
            }

            store.dispatch(TaskAction::Update {
                id: id.clone(),
                patch,
            })?;
            print_task(store, &id, "Updated task");
        }
        TaskCommand::Toggle { id } => {
            let id = ensure_known(store, &id)?;
            store.dispatch(TaskAction::Toggle(id.clone()))?;
            let completed = store.state().get(&id).is_some_and(|task| task.completed);
            let verb = if completed {
                "Completed task"
            } else {
                "Reopened task"
            };
            print_task(store, &id, verb);
        }
        TaskCommand::Delete { id } => {
            let id = ensure_known(store, &id)?;
            let outcome = store.dispatch(TaskAction::Delete(id.clone()))?;
            let verb = if outcome.changed {
                "Deleted task"
            } else {
                "Task already in trash"
            };
            print_task(store, &id, verb);
        }
        TaskCommand::Restore { id } => {
            let id = ensure_known(store, &id)?;
            let outcome = store.dispatch(TaskAction::Restore(id.clone()))?;
            let verb = if outcome.changed {
                "Restored task"
            } else {
                "Task already active"
            };
            print_task(store, &id, verb);
        }
        TaskCommand::List(args) => {
            let state = store.state();
            let filter = filter_for(args);
            if json {
                let payload: Vec<_> = state
                    .list(filter)
                    .map(|(id, task)| render::task_json(id, task, state.status_of(id)))
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else if state.list(filter).next().is_none() {
                match filter {
                    Filter::Active => println!("No tasks."),
                    Filter::Trashed => println!("Trash is empty."),
                }
            } else {
                println!(
                    "{}",
                    render::task_table(state.list(filter), &palette, render::local_offset())
                );
            }
        }
        TaskCommand::Show { id } => {
            let id = ensure_known(store, &id)?;
            let state = store.state();
            if let Some(task) = state.get(&id) {
                if json {
                    println!("{}", render::task_json(&id, task, state.status_of(&id)));
                } else {
                    println!(
                        "{}",
                        render::task_detail(&id, task, state.status_of(&id), render::local_offset())
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_transaction_command(
    session: &mut Session,
    config: &Config,
    command: TransactionCommand,
    json: bool,
) -> Result<(), AppError> {
    let palette = config.palette();
    let currency = config.currency_symbol();
    let store = &mut session.transactions;

    let ensure_known =
        |store: &TransactionStore<JsonFileSlots>, id: &str| -> Result<String, AppError> {
            let id = required_id(id)?;
            if store.state().contains(id) {
                Ok(id.to_string())
            } else {
                Err(AppError::invalid_input("transaction not found"))
            }
        };

    let print_transaction = |store: &TransactionStore<JsonFileSlots>, id: &str, verb: &str| {
        let state = store.state();
        if let Some(transaction) = state.get(id) {
            if json {
                println!(
                    "{}",
                    render::transaction_json(id, transaction, state.status_of(id))
                );
            } else {
                println!(
                    "{verb}: {} {} ({id})",
                    render::paint_amount(transaction, currency, &palette),
                    transaction.note
                );
            }
        }
    };

    match command {
        TransactionCommand::Add {
            amount,
            note,
            income,
            expense: _,
        } => {
            let amount = parse_amount(amount.as_deref())?;
            let kind = if income {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            };
            let mut draft = TransactionDraft::new(amount, kind);
            if let Some(note) = optional_text(note) {
                draft = draft.with_note(note);
            }

            let outcome = store.dispatch(TransactionAction::Create(draft))?;
            let id = outcome
                .created
                .ok_or_else(|| AppError::invalid_data("transaction was not created"))?;
            print_transaction(store, &id, &format!("Added {kind}"));
        }
        TransactionCommand::Edit {
            id,
            amount,
            note,
            kind,
        } => {
            let id = ensure_known(store, &id)?;
            let patch = TransactionPatch {
                amount: match amount {
                    Some(raw) => Some(parse_amount(Some(&raw))?),
                    None => None,
                },
                note: note.map(|text| text.trim().to_string()),
                kind: kind.map(|raw| raw.parse::<TransactionKind>()).transpose()?,
            };
            if patch.is_empty() {
                return Err(AppError::invalid_input("nothing to update"));
            }

            store.dispatch(TransactionAction::Update {
                id: id.clone(),
                patch,
            })?;
            print_transaction(store, &id, "Updated transaction");
        }
        TransactionCommand::Delete { id } => {
            let id = ensure_known(store, &id)?;
            let outcome = store.dispatch(TransactionAction::Delete(id.clone()))?;
            let verb = if outcome.changed {
                "Deleted transaction"
            } else {
                "Transaction already in trash"
            };
            print_transaction(store, &id, verb);
        }
        TransactionCommand::Restore { id } => {
            let id = ensure_known(store, &id)?;
            let outcome = store.dispatch(TransactionAction::Restore(id.clone()))?;
            let verb = if outcome.changed {
                "Restored transaction"
            } else {
                "Transaction already active"
            };
            print_transaction(store, &id, verb);
        }
        TransactionCommand::List(args) => {
            let state = store.state();
            let filter = filter_for(args);
            if json {
                let payload: Vec<_> = state
                    .list(filter)
                    .map(|(id, transaction)| {
                        render::transaction_json(id, transaction, state.status_of(id))
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else if state.list(filter).next().is_none() {
                match filter {
                    Filter::Active => println!("No transactions."),
                    Filter::Trashed => println!("Trash is empty."),
                }
            } else {
                println!(
                    "{}",
                    render::transaction_table(
                        state.list(filter),
                        currency,
                        &palette,
                        render::local_offset()
                    )
                );
            }
        }
        TransactionCommand::Tally => {
            let totals = transactions::tally(store.state());
            if json {
                println!("{}", render::tally_json(&totals));
            } else {
                println!("{}", render::tally_text(&totals, currency, &palette));
            }
        }
    }

    Ok(())
}

fn run_interactive(session: &mut Session) -> Result<(), AppError> {
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
            Ok(args) => session.config.expand_alias(args),
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("tally".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(session, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn exit_with(err: AppError) -> ! {
    eprintln!("ERROR: {}", err);
    std::process::exit(1);
}

fn main() {
    let loaded = load_config_with_fallback();
    let mut args = std::env::args_os();
    args.next();
    let interactive = args.next().is_none();

    let cli = if interactive {
        None
    } else {
        match Cli::try_parse() {
            Ok(cli) => Some(cli),
            Err(err) if !err.use_stderr() => {
                let _ = err.print();
                return;
            }
            Err(err) => exit_with(normalize_parse_error(err)),
        }
    };

    let config = match cli.as_ref() {
        Some(cli) => match effective_config(&loaded.config, &cli.config_override) {
            Ok(config) => config,
            Err(err) => exit_with(err),
        },
        None => loaded.config.clone(),
    };
    init_logging(&config);
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "using default configuration");
    }

    let mut session = match Session::open(loaded.config) {
        Ok(session) => session,
        Err(err) => exit_with(err),
    };

    let result = match cli {
        Some(cli) => run_command(&mut session, cli),
        None => run_interactive(&mut session),
    };

    if let Err(err) = result {
        exit_with(err);
    }
}

#[cfg(test)]
mod tests {
    use super::{optional_text, parse_amount, required_title, split_command_line};

    #[test]
    fn required_title_trims_and_rejects_blank() {
        assert_eq!(required_title(Some("  Buy milk ")).unwrap(), "Buy milk");
        assert_eq!(required_title(Some("   ")).unwrap_err().code(), "invalid_input");
        assert!(required_title(None).is_err());
    }

    #[test]
    fn parse_amount_accepts_non_negative_numbers() {
        assert_eq!(parse_amount(Some(" 12.50 ")).unwrap(), "12.50");
        assert_eq!(parse_amount(Some("0")).unwrap(), "0");
        assert!(parse_amount(Some("-3")).is_err());
        assert!(parse_amount(Some("abc")).is_err());
        assert!(parse_amount(Some("NaN")).is_err());
        assert_eq!(parse_amount(None).unwrap_err().message(), "amount is required");
    }

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" note ".to_string())).as_deref(), Some("note"));
    }

    #[test]
    fn split_command_line_honours_quotes() {
        let args = split_command_line("task add \"Buy milk\" -d \"2 \\\"big\\\" litres\"").unwrap();
        assert_eq!(args, vec!["task", "add", "Buy milk", "-d", "2 \"big\" litres"]);

        let err = split_command_line("task add \"open").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
