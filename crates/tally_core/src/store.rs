//! Owner of one module's state: loads its slot once, runs actions through the
//! reducer and mirrors every changed state back into the slot.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::model::{Task, Transaction};
use crate::state::{Collection, IdSource, MonotonicIds};
use crate::storage::SlotStore;
use crate::tasks::{self, TaskAction};
use crate::transactions::{self, TransactionAction};

pub trait Module {
    type Record: Clone + PartialEq + Serialize + DeserializeOwned;
    type Action;

    /// Slot the module's state is persisted under.
    const SLOT: &'static str;

    fn reduce(
        state: &Collection<Self::Record>,
        action: Self::Action,
        ids: &mut dyn IdSource,
    ) -> Collection<Self::Record>;

    fn action_name(action: &Self::Action) -> &'static str;

    fn is_create(action: &Self::Action) -> bool;

    fn is_load(action: &Self::Action) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Tasks;

impl Module for Tasks {
    type Record = Task;
    type Action = TaskAction;

    const SLOT: &'static str = "tasks";

    fn reduce(
        state: &Collection<Task>,
        action: TaskAction,
        ids: &mut dyn IdSource,
    ) -> Collection<Task> {
        tasks::reduce(state, action, ids)
    }

    fn action_name(action: &TaskAction) -> &'static str {
        action.name()
    }

    fn is_create(action: &TaskAction) -> bool {
        action.is_create()
    }

    fn is_load(action: &TaskAction) -> bool {
        action.is_load()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transactions;

impl Module for Transactions {
    type Record = Transaction;
    type Action = TransactionAction;

    const SLOT: &'static str = "transactions";

    fn reduce(
        state: &Collection<Transaction>,
        action: TransactionAction,
        ids: &mut dyn IdSource,
    ) -> Collection<Transaction> {
        transactions::reduce(state, action, ids)
    }

    fn action_name(action: &TransactionAction) -> &'static str {
        action.name()
    }

    fn is_create(action: &TransactionAction) -> bool {
        action.is_create()
    }

    fn is_load(action: &TransactionAction) -> bool {
        action.is_load()
    }
}

/// Result of a dispatched action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub changed: bool,
    pub created: Option<String>,
}

pub struct Store<M: Module, S: SlotStore> {
    state: Collection<M::Record>,
    slots: S,
    ids: MonotonicIds,
}

impl<M: Module, S: SlotStore> Store<M, S> {
    /// Reads the module's slot. A missing, unreadable or unparseable slot
    /// yields the empty state.
    pub fn open(slots: S) -> Self {
        let state = load_slot::<M::Record>(&slots, M::SLOT);
        let ids = MonotonicIds::seeded(state.records.keys());
        Self { state, slots, ids }
    }

    pub fn state(&self) -> &Collection<M::Record> {
        &self.state
    }

    pub fn slots(&self) -> &S {
        &self.slots
    }

    /// Applies `action` and writes the new state when it differs from the
    /// old one. The transition is kept even if the write fails.
    pub fn dispatch(&mut self, action: M::Action) -> Result<Dispatch, AppError> {
        let name = M::action_name(&action);
        let is_create = M::is_create(&action);
        let is_load = M::is_load(&action);
        let next = M::reduce(&self.state, action, &mut self.ids);
        let changed = next != self.state;
        // Create always appends its new id to the active list.
        let created = if is_create && changed {
            next.active_ids.last().cloned()
        } else {
            None
        };

        tracing::debug!(slot = M::SLOT, action = name, changed, "dispatched");
        if !changed {
            return Ok(Dispatch { changed, created });
        }

        self.state = next;
        if is_load {
            self.ids.observe(self.state.records.keys());
        }
        self.persist()?;

        Ok(Dispatch { changed, created })
    }

    pub fn snapshot_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(&self.state)
            .map_err(|err| AppError::invalid_data(err.to_string()))
    }

    fn persist(&mut self) -> Result<(), AppError> {
        let content = self.snapshot_json()?;
        self.slots.write(M::SLOT, &content)
    }
}

pub type TaskStore<S> = Store<Tasks, S>;
pub type TransactionStore<S> = Store<Transactions, S>;

fn load_slot<R: DeserializeOwned>(slots: &dyn SlotStore, slot: &str) -> Collection<R> {
    let content = match slots.read(slot) {
        Ok(Some(content)) => content,
        Ok(None) => {
            tracing::debug!(slot, "slot is empty, starting fresh");
            return Collection::default();
        }
        Err(err) => {
            tracing::warn!(slot, error = %err, "failed to read slot, starting fresh");
            return Collection::default();
        }
    };

    let state: Collection<R> = match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(slot, error = %err, "slot is not a valid snapshot, starting fresh");
            return Collection::default();
        }
    };

    for issue in state.integrity_issues() {
        tracing::warn!(slot, %issue, "loaded snapshot violates integrity");
    }

    state
}
