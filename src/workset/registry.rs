use indexmap::IndexMap;
use log::info;

use crate::error::{Error, Result};
use crate::workset::WorkingSet;

/// Named working sets with one optionally active.
#[derive(Debug, Default)]
pub struct ModRegistry {
    mods: IndexMap<String, WorkingSet>,
    active: Option<String>,
}

impl ModRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty working set and makes it active.
    pub fn create(&mut self, name: &str) -> Result<&mut WorkingSet> {
        if self.mods.contains_key(name) {
            return Err(Error::NameTaken {
                kind: "working set",
                name: name.to_string(),
            });
        }
        self.mods.insert(name.to_string(), WorkingSet::new(name));
        self.active = Some(name.to_string());
        info!("Created working set {name}");
        self.get_mut(name)
            .ok_or_else(|| missing(name))
    }

    pub fn get(&self, name: &str) -> Option<&WorkingSet> {
        self.mods.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorkingSet> {
        self.mods.get_mut(name)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.mods.contains_key(name) {
            return Err(missing(name));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&WorkingSet> {
        self.active.as_deref().and_then(|name| self.mods.get(name))
    }

    pub fn active_mut(&mut self) -> Option<&mut WorkingSet> {
        match self.active.as_deref() {
            Some(name) => self.mods.get_mut(name),
            None => None,
        }
    }

    /// Removes a working set. If it was active, the first remaining one (if
    /// any) becomes active.
    pub fn delete(&mut self, name: &str) -> Result<WorkingSet> {
        let removed = self.mods.shift_remove(name).ok_or_else(|| missing(name))?;
        if self.active.as_deref() == Some(name) {
            self.active = self.mods.keys().next().cloned();
        }
        info!("Deleted working set {name}");
        Ok(removed)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return if self.mods.contains_key(old) {
                Ok(())
            } else {
                Err(missing(old))
            };
        }
        if self.mods.contains_key(new) {
            return Err(Error::NameTaken {
                kind: "working set",
                name: new.to_string(),
            });
        }
        let index = self.mods.get_index_of(old).ok_or_else(|| missing(old))?;
        let (_, mut set) = self
            .mods
            .shift_remove_index(index)
            .ok_or_else(|| missing(old))?;
        set.name = new.to_string();
        self.mods.shift_insert(index, new.to_string(), set);
        if self.active.as_deref() == Some(old) {
            self.active = Some(new.to_string());
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.mods.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }
}

fn missing(name: &str) -> Error {
    Error::NameNotFound {
        kind: "working set",
        name: name.to_string(),
    }
}
