use std::{collections::HashSet, path::Path};

use schema::{Role, UserIdentity};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub username: String,
    /// Compared verbatim, this is not a credential store
    pub password: String,
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl DirectoryEntry {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Known users, fixed for the lifetime of the process
pub trait UserDirectory: Send + Sync {
    /// All entries in roster order
    fn entries(&self) -> &[DirectoryEntry];

    fn authenticate(&self, username: &str, password: &str) -> Result<UserIdentity, Error> {
        match self.entries().iter().find(|e| e.username == username) {
            Some(entry) if entry.password == password => Ok(entry.identity()),
            _ => Err(Error::Auth),
        }
    }

    fn students(&self) -> Vec<&DirectoryEntry> {
        self.entries()
            .iter()
            .filter(|e| e.role == Role::Student)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct InMemoryDirectory {
    entries: Vec<DirectoryEntry>,
}

impl InMemoryDirectory {
    /// Rejects rosters with a repeated id or username
    pub fn new(entries: Vec<DirectoryEntry>) -> Result<Self, Error> {
        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for entry in &entries {
            if !ids.insert(entry.id.as_str()) {
                return Err(Error::InvalidDirectory(format!(
                    "duplicate user id in directory: {}",
                    entry.id
                )));
            }
            if !usernames.insert(entry.username.as_str()) {
                return Err(Error::InvalidDirectory(format!(
                    "duplicate username in directory: {}",
                    entry.username
                )));
            }
        }
        Ok(InMemoryDirectory { entries })
    }

    /// Loads a JSON array of entries
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidDirectory(format!("unable to read {}: {e}", path.display()))
        })?;
        let entries: Vec<DirectoryEntry> = serde_json::from_str(&contents).map_err(|e| {
            Error::InvalidDirectory(format!("unable to parse {}: {e}", path.display()))
        })?;
        Self::new(entries)
    }

    /// Built-in roster used when no directory file is configured
    pub fn demo() -> Self {
        let entry = |username: &str, password: &str, id: &str, name: &str, role| DirectoryEntry {
            username: username.to_string(),
            password: password.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            role,
        };
        InMemoryDirectory {
            entries: vec![
                entry("Leni", "123", "MCA-428", "Leni E", Role::Student),
                entry(
                    "teacher",
                    "admin",
                    "tch-99b3",
                    "Professor Jenifer Jose",
                    Role::Teacher,
                ),
                entry("Soni", "123", "MCA-112", "Soni Priya", Role::Student),
            ],
        }
    }
}

impl UserDirectory for InMemoryDirectory {
    fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }
}
