//! Task reducer.
//!
//! `reduce` is a pure transition: it reads the previous state, never mutates
//! it, and returns the next one. Actions naming an unknown id leave the state
//! unchanged.

use crate::model::{Task, TaskDraft, TaskPatch};
use crate::state::{Collection, IdSource};

pub type TaskState = Collection<Task>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Create(TaskDraft),
    Update { id: String, patch: TaskPatch },
    Toggle(String),
    Delete(String),
    Restore(String),
    Load(TaskState),
}

impl TaskAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
            Self::Toggle(_) => "toggle",
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

pub fn reduce(state: &TaskState, action: TaskAction, ids: &mut dyn IdSource) -> TaskState {
    match action {
        TaskAction::Create(draft) => {
            let stamp = state.fresh_stamp(ids);
            let task = Task {
                title: draft.title,
                description: draft.description,
                completed: false,
                created_at: stamp.created_at,
            };
            let mut next = state.clone();
            next.insert(stamp.id, task);
            next
        }
        TaskAction::Update { id, patch } => {
            let mut next = state.clone();
            if let Some(task) = next.record_mut(&id) {
                patch.apply(task);
            }
            next
        }
        TaskAction::Toggle(id) => {
            let mut next = state.clone();
            if let Some(task) = next.record_mut(&id) {
                task.completed = !task.completed;
            }
            next
        }
        TaskAction::Delete(id) => {
            let mut next = state.clone();
            next.trash(&id);
            next
        }
        TaskAction::Restore(id) => {
            let mut next = state.clone();
            next.restore(&id);
            next
        }
        TaskAction::Load(snapshot) => snapshot,
    }
}
