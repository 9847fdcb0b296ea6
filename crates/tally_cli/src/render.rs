//! Plain-text and JSON rendering of tasks, transactions and tallies.

use serde_json::{Value, json};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tally_core::config::Palette;
use tally_core::model::{Task, Transaction, TransactionKind};
use tally_core::state::Status;
use tally_core::transactions::Tally;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Done")]
    done: &'static str,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Note")]
    note: String,
    #[tabled(rename = "Created")]
    created: String,
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn format_created(created_at: OffsetDateTime, offset: UtcOffset) -> String {
    created_at
        .to_offset(offset)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| created_at.to_string())
}

fn rfc3339(created_at: OffsetDateTime) -> String {
    created_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| created_at.to_string())
}

pub fn signed_amount(transaction: &Transaction, currency: &str) -> String {
    let sign = match transaction.kind {
        TransactionKind::Income => '+',
        TransactionKind::Expense => '-',
    };
    format!("{sign}{currency}{}", transaction.amount.trim())
}

pub fn paint_amount(transaction: &Transaction, currency: &str, palette: &Palette) -> String {
    let text = signed_amount(transaction, currency);
    match transaction.kind {
        TransactionKind::Income => palette.positive(&text),
        TransactionKind::Expense => palette.negative(&text),
    }
}

pub fn task_table<'a, I>(tasks: I, palette: &Palette, offset: UtcOffset) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Task)>,
{
    let rows: Vec<TaskRow> = tasks
        .into_iter()
        .map(|(id, task)| TaskRow {
            id: id.to_string(),
            done: if task.completed { "[x]" } else { "[ ]" },
            title: if task.completed {
                palette.positive(&task.title)
            } else {
                task.title.clone()
            },
            created: palette.muted(&format_created(task.created_at, offset)),
        })
        .collect();

    Table::new(rows).with(Style::psql()).to_string()
}

pub fn transaction_table<'a, I>(
    transactions: I,
    currency: &str,
    palette: &Palette,
    offset: UtcOffset,
) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Transaction)>,
{
    let rows: Vec<TransactionRow> = transactions
        .into_iter()
        .map(|(id, transaction)| TransactionRow {
            id: id.to_string(),
            amount: paint_amount(transaction, currency, palette),
            note: transaction.note.clone(),
            created: palette.muted(&format_created(transaction.created_at, offset)),
        })
        .collect();

    Table::new(rows).with(Style::psql()).to_string()
}

pub fn task_json(id: &str, task: &Task, status: Option<Status>) -> Value {
    json!({
        "id": id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "status": status.map(Status::as_str),
        "created_at": rfc3339(task.created_at),
    })
}

pub fn transaction_json(id: &str, transaction: &Transaction, status: Option<Status>) -> Value {
    json!({
        "id": id,
        "amount": transaction.amount,
        "note": transaction.note,
        "type": transaction.kind.as_str(),
        "status": status.map(Status::as_str),
        "created_at": rfc3339(transaction.created_at),
    })
}

pub fn task_detail(
    id: &str,
    task: &Task,
    status: Option<Status>,
    offset: UtcOffset,
) -> String {
    let description = task.description.as_deref().unwrap_or("-");
    let progress = if task.completed { "completed" } else { "open" };
    let state = status.map(Status::as_str).unwrap_or("unlisted");
    format!(
        "ID: {id}\nTitle: {}\nDescription: {description}\nProgress: {progress}\nState: {state}\nCreated: {}",
        task.title,
        format_created(task.created_at, offset)
    )
}

pub fn tally_text(tally: &Tally, currency: &str, palette: &Palette) -> String {
    let balance = format!("{currency}{:.2}", tally.balance);
    let balance = if tally.balance < 0.0 {
        palette.negative(&balance)
    } else {
        palette.positive(&balance)
    };
    format!(
        "Income: {currency}{:.2}\nExpense: {currency}{:.2}\nBalance: {balance}",
        tally.income, tally.expense
    )
}

pub fn tally_json(tally: &Tally) -> Value {
    json!({
        "income": tally.income,
        "expense": tally.expense,
        "balance": tally.balance,
    })
}
