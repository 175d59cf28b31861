//! `SQLite` store for archived chats.
//!
//! Three tables keyed by natural identity; every write is an individual
//! `INSERT OR REPLACE`, so re-running a save converges to the same rows.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::domain::{AppError, EntityRef, Message, Participant, Reaction, Result};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS messages (
        chat_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        msg_id INTEGER NOT NULL,
        msg_text TEXT NOT NULL,
        msg_dt TEXT NOT NULL,
        reply_to_msg_id INTEGER,
        PRIMARY KEY (chat_id, msg_id)
    );

    CREATE TABLE IF NOT EXISTS reactions (
        chat_id INTEGER NOT NULL,
        msg_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        emoticon TEXT NOT NULL,
        PRIMARY KEY (chat_id, msg_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS users (
        chat_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        user_name TEXT NOT NULL,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (chat_id, user_id)
    );

    CREATE INDEX IF NOT EXISTS idx_messages_dt ON messages(chat_id, msg_dt);
";

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub messages: usize,
    pub reactions: usize,
    pub users: usize,
}

/// Archive database backed by `SQLite`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database and its schema.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::io("Failed to create database directory", e))?;
            }
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::database)?;

        let store = Self { conn };
        store.init_schema()?;

        Ok(store)
    }

    /// Opens a private in-memory database.
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::database)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(AppError::database)
    }

    /// Upserts a message row (reactions are written separately).
    ///
    /// # Errors
    /// Returns `Write` identifying the message if the store rejects it.
    pub fn upsert_message(&self, msg: &Message) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT OR REPLACE INTO messages
                (chat_id, user_id, msg_id, msg_text, msg_dt, reply_to_msg_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
                params![
                    msg.chat_id(),
                    msg.user_id(),
                    msg.msg_id(),
                    msg.text(),
                    msg.date().to_rfc3339(),
                    msg.reply_to_msg_id(),
                ],
            )
            .map_err(|e| {
                AppError::write(
                    EntityRef::Message {
                        chat_id: msg.chat_id(),
                        msg_id: msg.msg_id(),
                    },
                    e,
                )
            })?;

        Ok(())
    }

    /// Upserts a reaction row.
    ///
    /// # Errors
    /// Returns `Write` identifying the reaction if the store rejects it.
    pub fn upsert_reaction(&self, reaction: &Reaction) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT OR REPLACE INTO reactions (chat_id, msg_id, user_id, emoticon)
            VALUES (?1, ?2, ?3, ?4)
            ",
                params![
                    reaction.chat_id(),
                    reaction.msg_id(),
                    reaction.user_id(),
                    reaction.emoticon(),
                ],
            )
            .map_err(|e| {
                AppError::write(
                    EntityRef::Reaction {
                        chat_id: reaction.chat_id(),
                        msg_id: reaction.msg_id(),
                        user_id: reaction.user_id(),
                    },
                    e,
                )
            })?;

        Ok(())
    }

    /// Upserts a user row.
    ///
    /// # Errors
    /// Returns `Write` identifying the participant if the store rejects it.
    pub fn upsert_participant(&self, user: &Participant) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT OR REPLACE INTO users (chat_id, user_id, user_name, first_name, last_name)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
                params![
                    user.chat_id(),
                    user.user_id(),
                    user.user_name(),
                    user.first_name(),
                    user.last_name(),
                ],
            )
            .map_err(|e| {
                AppError::write(
                    EntityRef::Participant {
                        chat_id: user.chat_id(),
                        user_id: user.user_id(),
                    },
                    e,
                )
            })?;

        Ok(())
    }

    /// Row counts of all three tables.
    ///
    /// # Errors
    /// Returns error if a count query fails.
    pub fn counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            messages: self.count("messages")?,
            reactions: self.count("reactions")?,
            users: self.count("users")?,
        })
    }

    fn count(&self, table: &str) -> Result<usize> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|c| usize::try_from(c).unwrap_or_default())
            .map_err(AppError::database)
    }

    #[cfg(test)]
    pub(crate) const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// All message ids of a chat, ascending.
    #[cfg(test)]
    pub(crate) fn message_ids(&self, chat_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT msg_id FROM messages WHERE chat_id = ?1 ORDER BY msg_id")
            .map_err(AppError::database)?;
        let rows = stmt
            .query_map([chat_id], |row| row.get(0))
            .map_err(AppError::database)?;
        rows.collect::<rusqlite::Result<Vec<i64>>>()
            .map_err(AppError::database)
    }

    /// Full text dump of every table, ordered by key.
    #[cfg(test)]
    pub(crate) fn dump(&self) -> Result<Vec<String>> {
        let queries = [
            "SELECT 'm', chat_id, msg_id, user_id, msg_text, msg_dt, reply_to_msg_id \
             FROM messages ORDER BY chat_id, msg_id",
            "SELECT 'r', chat_id, msg_id, user_id, emoticon, NULL, NULL \
             FROM reactions ORDER BY chat_id, msg_id, user_id",
            "SELECT 'u', chat_id, user_id, NULL, user_name, first_name, last_name \
             FROM users ORDER BY chat_id, user_id",
        ];

        let mut out = Vec::new();
        for query in queries {
            let mut stmt = self.conn.prepare(query).map_err(AppError::database)?;
            let rows = stmt
                .query_map([], |row| {
                    let mut cells = Vec::with_capacity(7);
                    for i in 0..7 {
                        let cell: rusqlite::types::Value = row.get(i)?;
                        cells.push(format!("{cell:?}"));
                    }
                    Ok(cells.join("|"))
                })
                .map_err(AppError::database)?;
            for row in rows {
                out.push(row.map_err(AppError::database)?);
            }
        }

        Ok(out)
    }
}

/// Creates a fresh database file with the archive schema.
///
/// An existing file is an error unless `drop_if_exists` is set, in which case
/// it is deleted first along with its `-wal` and `-shm` files.
///
/// # Errors
/// Returns `Config` if the file exists and may not be dropped, or any error
/// from deleting or creating it.
pub fn init_database(path: &Path, drop_if_exists: bool) -> Result<SqliteStore> {
    if path.exists() {
        if !drop_if_exists {
            return Err(AppError::Config {
                message: format!("Database at {} already exists", path.display()),
            });
        }

        tracing::warn!(path = %path.display(), "Database already exists, deleting it");
        for file in std::iter::once(path.to_path_buf()).chain(wal_files(path)) {
            if file.exists() {
                std::fs::remove_file(&file).map_err(|e| {
                    AppError::io(format!("Failed to delete {}", file.display()), e)
                })?;
            }
        }
    }

    let store = SqliteStore::open(path)?;
    tracing::info!(path = %path.display(), "Database created");

    Ok(store)
}

/// Journal files `SQLite` keeps next to a database in WAL mode.
fn wal_files(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    ["-wal", "-shm"].into_iter().map(move |suffix| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    })
}
