use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use color_eyre::eyre::{Context, ContextCompat, Result, eyre};
use rusqlite::{Connection, OptionalExtension, params};

use crate::config;

const DATABASE_FILENAME: &str = "coursegen.sqlite";
const TOKEN_KEY: &str = "token";

/// Small key/value table standing in for browser local storage.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Open the store inside the configured data directory.
    pub fn open_default() -> Result<Self> {
        let dir = config::data_directory().map_err(|err| eyre!(err))?;
        Self::open_at(dir.join(DATABASE_FILENAME))
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        let mut connection = store.connection()?;
        initialize_schema(&mut connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_token(&self) -> Result<Option<String>> {
        self.get(TOKEN_KEY)
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<()> {
        let connection = self.connection()?;
        connection
            .execute("DELETE FROM local_storage WHERE key = ?1", params![TOKEN_KEY])
            .wrap_err("failed to clear stored token")?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let connection = self.connection()?;
        connection
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .wrap_err_with(|| format!("failed to read `{}` from local storage", key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection()?;
        connection
            .execute(
                "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .wrap_err_with(|| format!("failed to write `{}` to local storage", key))?;
        Ok(())
    }

    fn connection(&self) -> Result<Connection> {
        let parent = self
            .path
            .parent()
            .context("token store path has no parent directory")?;
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create directory for token store at {}",
                parent.display()
            )
        })?;

        Connection::open(&self.path)
            .wrap_err_with(|| format!("failed to open token store at {}", self.path.display()))
    }
}

fn initialize_schema(connection: &mut Connection) -> Result<()> {
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .wrap_err("failed to create local_storage table")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn temp_store(label: &str) -> (PathBuf, TokenStore) {
        let mut temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        temp_dir.push(format!("coursegen-{label}-{unique}"));
        fs::create_dir_all(&temp_dir).unwrap();
        let store = TokenStore::open_at(temp_dir.join("test.sqlite")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn token_round_trips_and_overwrites() {
        let (temp_dir, store) = temp_store("token-store");

        assert_eq!(store.load_token().unwrap(), None);
        store.save_token("first").unwrap();
        store.save_token("second").unwrap();
        assert_eq!(store.load_token().unwrap().as_deref(), Some("second"));

        let count: i64 = Connection::open(store.path())
            .unwrap()
            .query_row("SELECT COUNT(*) FROM local_storage", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        fs::remove_dir_all(&temp_dir).unwrap();
    }

    #[test]
    fn clear_token_survives_reopen() {
        let (temp_dir, store) = temp_store("token-clear");
        store.save_token("abc").unwrap();
        store.clear_token().unwrap();

        let reopened = TokenStore::open_at(store.path()).unwrap();
        assert_eq!(reopened.load_token().unwrap(), None);

        fs::remove_dir_all(&temp_dir).unwrap();
    }
}
