use crate::error::AppError;
use crate::storage::SlotStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const STORE_DIR_ENV_VAR: &str = "TALLY_STORE_DIR";
const APP_DIR_NAME: &str = "tally";

pub fn store_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    app_dir()
}

pub(crate) fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

/// One `<slot>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSlots {
    dir: PathBuf,
}

impl JsonFileSlots {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl SlotStore for JsonFileSlots {
    fn read(&self, slot: &str) -> Result<Option<String>, AppError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        tracing::debug!(slot, path = %path.display(), bytes = content.len(), "read slot");
        Ok(Some(content))
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<(), AppError> {
        let path = self.slot_path(slot);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        std::fs::write(&path, contents).map_err(|err| AppError::io(err.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        tracing::debug!(slot, path = %path.display(), bytes = contents.len(), "wrote slot");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: HashMap<String, String>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot<S: Into<String>, C: Into<String>>(mut self, slot: S, contents: C) -> Self {
        self.slots.insert(slot.into(), contents.into());
        self
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }
}

impl SlotStore for MemorySlots {
    fn read(&self, slot: &str) -> Result<Option<String>, AppError> {
        Ok(self.slots.get(slot).cloned())
    }

    fn write(&mut self, slot: &str, contents: &str) -> Result<(), AppError> {
        self.slots.insert(slot.to_string(), contents.to_string());
        Ok(())
    }
}
