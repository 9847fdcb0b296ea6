//! Transaction reducer and the balance tally over active transactions.

use serde::Serialize;

use crate::model::{Transaction, TransactionDraft, TransactionKind, TransactionPatch};
use crate::state::{Collection, Filter, IdSource};

pub type TransactionState = Collection<Transaction>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAction {
    Create(TransactionDraft),
    Update {
        id: String,
        patch: TransactionPatch,
    },
    Delete(String),
    Restore(String),
    Load(TransactionState),
}

impl TransactionAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
            Self::Delete(_) => "delete",
            Self::Restore(_) => "restore",
            Self::Load(_) => "load",
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }

    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load(_))
    }
}

pub fn reduce(
    state: &TransactionState,
    action: TransactionAction,
    ids: &mut dyn IdSource,
) -> TransactionState {
    match action {
        TransactionAction::Create(draft) => {
            let stamp = state.fresh_stamp(ids);
            let transaction = Transaction {
                amount: draft.amount,
                note: draft.note,
                kind: draft.kind,
                created_at: stamp.created_at,
            };
            let mut next = state.clone();
            next.insert(stamp.id, transaction);
            next
        }
        TransactionAction::Update { id, patch } => {
            let mut next = state.clone();
            if let Some(transaction) = next.record_mut(&id) {
                patch.apply(transaction);
            }
            next
        }
        TransactionAction::Delete(id) => {
            let mut next = state.clone();
            next.trash(&id);
            next
        }
        TransactionAction::Restore(id) => {
            let mut next = state.clone();
            next.restore(&id);
            next
        }
        TransactionAction::Load(snapshot) => snapshot,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Sums active transactions by kind. Trashed transactions are ignored and an
/// unparseable amount counts as zero.
pub fn tally(state: &TransactionState) -> Tally {
    let mut totals = Tally::default();

    for (id, transaction) in state.list(Filter::Active) {
        let Some(amount) = transaction.amount_value() else {
            tracing::warn!(id, amount = %transaction.amount, "skipping unparseable amount");
            continue;
        };
        match transaction.kind {
            TransactionKind::Income => totals.income += amount,
            TransactionKind::Expense => totals.expense += amount,
        }
    }

    totals.balance = totals.income - totals.expense;
    totals
}

#[cfg(test)]
mod tests {
    use super::{Tally, TransactionAction, TransactionState, reduce, tally};
    use crate::model::{TransactionDraft, TransactionKind, TransactionPatch};
    use crate::state::SequenceIds;
    use time::macros::datetime;

    fn run(actions: Vec<TransactionAction>) -> TransactionState {
        let mut ids = SequenceIds::new(datetime!(2025-12-20 00:00 UTC));
        actions
            .into_iter()
            .fold(TransactionState::default(), |state, action| {
                reduce(&state, action, &mut ids)
            })
    }

    fn income(amount: &str) -> TransactionAction {
        TransactionAction::Create(TransactionDraft::new(amount, TransactionKind::Income))
    }

    fn expense(amount: &str) -> TransactionAction {
        TransactionAction::Create(TransactionDraft::new(amount, TransactionKind::Expense))
    }

    #[test]
    fn create_never_replaces_an_existing_transaction() {
        let existing = run(vec![income("100")]);

        let mut ids = SequenceIds::new(datetime!(2025-12-20 00:00 UTC));
        let state = reduce(&existing, expense("40"), &mut ids);

        assert_eq!(state.len(), 2);
        assert_eq!(state.get("1").unwrap().amount, "100");
        assert_eq!(state.active_ids, vec!["1", "2"]);
        assert_eq!(tally(&state).balance, 60.0);
    }

    #[test]
    fn create_appends_active_transaction() {
        let state = run(vec![TransactionAction::Create(
            TransactionDraft::new("12.50", TransactionKind::Expense).with_note("lunch"),
        )]);

        assert_eq!(state.active_ids, vec!["1"]);
        let transaction = state.get("1").unwrap();
        assert_eq!(transaction.amount, "12.50");
        assert_eq!(transaction.note, "lunch");
        assert_eq!(transaction.kind, TransactionKind::Expense);
    }

    #[test]
    fn tally_sums_income_and_expense() {
        let state = run(vec![income("100"), expense("40")]);

        assert_eq!(
            tally(&state),
            Tally {
                income: 100.0,
                expense: 40.0,
                balance: 60.0,
            }
        );
    }

    #[test]
    fn tally_ignores_trashed_transactions() {
        let state = run(vec![
            income("100"),
            expense("40"),
            expense("25"),
            TransactionAction::Delete("2".to_string()),
        ]);

        let totals = tally(&state);
        assert_eq!(totals.expense, 25.0);
        assert_eq!(totals.balance, 75.0);
    }

    #[test]
    fn tally_of_empty_state_is_zero() {
        assert_eq!(tally(&TransactionState::default()), Tally::default());
    }

    #[test]
    fn tally_skips_unparseable_amounts() {
        let state = run(vec![income("100"), expense("abc")]);

        assert_eq!(tally(&state).balance, 100.0);
    }

    #[test]
    fn update_can_switch_kind() {
        let state = run(vec![
            expense("40"),
            TransactionAction::Update {
                id: "1".to_string(),
                patch: TransactionPatch {
                    kind: Some(TransactionKind::Income),
                    ..TransactionPatch::default()
                },
            },
        ]);

        let transaction = state.get("1").unwrap();
        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.amount, "40");
        assert_eq!(tally(&state).balance, 40.0);
    }

    #[test]
    fn update_replaces_amount_and_note() {
        let state = run(vec![
            TransactionAction::Create(
                TransactionDraft::new("5", TransactionKind::Expense).with_note("coffee"),
            ),
            TransactionAction::Update {
                id: "1".to_string(),
                patch: TransactionPatch {
                    amount: Some("6".to_string()),
                    note: Some("better coffee".to_string()),
                    kind: None,
                },
            },
        ]);

        let transaction = state.get("1").unwrap();
        assert_eq!(transaction.amount, "6");
        assert_eq!(transaction.note, "better coffee");
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.created_at, datetime!(2025-12-20 00:00 UTC));
    }

    #[test]
    fn update_of_unknown_id_is_unchanged() {
        let before = run(vec![income("1")]);
        let mut ids = SequenceIds::new(datetime!(2025-12-20 00:00 UTC));

        let after = reduce(
            &before,
            TransactionAction::Update {
                id: "missing".to_string(),
                patch: TransactionPatch {
                    amount: Some("2".to_string()),
                    ..TransactionPatch::default()
                },
            },
            &mut ids,
        );

        assert_eq!(after, before);
    }

    #[test]
    fn delete_and_restore_are_idempotent() {
        let deleted = run(vec![income("1"), TransactionAction::Delete("1".to_string())]);
        let mut ids = SequenceIds::new(datetime!(2025-12-20 00:00 UTC));

        let deleted_again = reduce(&deleted, TransactionAction::Delete("1".to_string()), &mut ids);
        assert_eq!(deleted_again, deleted);

        let restored = reduce(&deleted, TransactionAction::Restore("1".to_string()), &mut ids);
        let restored_again =
            reduce(&restored, TransactionAction::Restore("1".to_string()), &mut ids);
        assert_eq!(restored.active_ids, vec!["1"]);
        assert_eq!(restored_again, restored);
    }

    #[test]
    fn serialized_layout_matches_slot_format() {
        let state = run(vec![TransactionAction::Create(
            TransactionDraft::new("100", TransactionKind::Income).with_note("salary"),
        )]);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "activeIds": ["1"],
                "trashedIds": [],
                "records": {
                    "1": {
                        "amount": "100",
                        "note": "salary",
                        "type": "income",
                        "createdAt": "2025-12-20T00:00:00Z"
                    }
                }
            })
        );
    }
}
