//! Database module for twin chat
//!
//! Provides persistence for twins, their messages and conversation state.

mod schema;

pub use schema::*;

use crate::state_machine::StateUpdate;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Twin not found: {0}")]
    TwinNotFound(String),
    #[error("Conversation state not found for twin: {0}")]
    StateNotFound(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Twin Operations ====================

    /// Create a new twin
    pub fn create_twin(
        &self,
        id: &str,
        name: &str,
        bio: &str,
        personality: &Personality,
        music_summary: Option<&str>,
        film_summary: Option<&str>,
    ) -> DbResult<TwinProfile> {
        let conn = self.conn()?;
        let now = Utc::now();
        let personality_json = serde_json::to_string(personality)?;

        conn.execute(
            "INSERT INTO twins (id, name, bio, personality, music_summary, film_summary, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![id, name, bio, personality_json, music_summary, film_summary, now.to_rfc3339()],
        )?;

        Ok(TwinProfile {
            id: id.to_string(),
            name: name.to_string(),
            bio: bio.to_string(),
            personality: personality.clone(),
            music_summary: music_summary.map(String::from),
            film_summary: film_summary.map(String::from),
            created_at: now,
        })
    }

    /// Get twin by ID
    pub fn get_twin(&self, id: &str) -> DbResult<TwinProfile> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, bio, personality, music_summary, film_summary, created_at
             FROM twins WHERE id = ?1",
        )?;

        stmt.query_row(params![id], |row| {
            let personality_json: String = row.get(3)?;
            Ok(TwinProfile {
                id: row.get(0)?,
                name: row.get(1)?,
                bio: row.get(2)?,
                personality: serde_json::from_str(&personality_json).unwrap_or_default(),
                music_summary: row.get(4)?,
                film_summary: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::TwinNotFound(id.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    // ==================== Message Operations ====================

    /// Append a message to a twin's chat
    pub fn add_message(
        &self,
        message_id: &str,
        twin_id: &str,
        content: &str,
        is_user: bool,
    ) -> DbResult<Message> {
        let conn = self.conn()?;
        insert_message(&conn, message_id, twin_id, content, is_user)
    }

    /// Append a user message and the twin's reply together; neither is
    /// stored if either insert fails.
    pub fn add_exchange(
        &self,
        twin_id: &str,
        user: (&str, &str),
        reply: (&str, &str),
    ) -> DbResult<(Message, Message)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let user_message = insert_message(&tx, user.0, twin_id, user.1, true)?;
        let reply_message = insert_message(&tx, reply.0, twin_id, reply.1, false)?;
        tx.commit()?;
        Ok((user_message, reply_message))
    }

    /// Get all messages for a twin, oldest first
    pub fn get_messages(&self, twin_id: &str) -> DbResult<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, twin_id, sequence_id, content, is_user, created_at
             FROM messages WHERE twin_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![twin_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get the last `limit` messages for a twin, oldest first
    pub fn get_recent_messages(&self, twin_id: &str, limit: usize) -> DbResult<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, twin_id, sequence_id, content, is_user, created_at
             FROM messages WHERE twin_id = ?1 ORDER BY sequence_id DESC LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![twin_id, limit], parse_message_row)?;
        let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Delete every message of a twin, returning how many were removed
    pub fn delete_messages(&self, twin_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM messages WHERE twin_id = ?1", params![twin_id])?;
        Ok(deleted)
    }

    // ==================== Conversation State Operations ====================

    /// Get the conversation state for a twin, if one exists
    pub fn get_conversation_state(&self, twin_id: &str) -> DbResult<Option<ConversationState>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT twin_id, current_phase, last_response_type, insights, parent_mentioned, updated_at
             FROM conversation_states WHERE twin_id = ?1",
        )?;

        let row = stmt
            .query_row(params![twin_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;

        let Some((twin_id, phase, response_type, insights, parent_mentioned, updated_at)) = row
        else {
            return Ok(None);
        };

        let current_phase = Phase::from_stored(&phase);
        if !current_phase.is_structured() {
            tracing::warn!(twin_id = %twin_id, stored = %phase, "Unrecognized conversation phase in storage");
        }

        Ok(Some(ConversationState {
            twin_id,
            current_phase,
            last_response_type: ResponseType::from_stored(&response_type),
            insights: serde_json::from_str(&insights)?,
            parent_mentioned,
            updated_at: parse_datetime(&updated_at),
        }))
    }

    /// Insert a full conversation state row
    pub fn insert_conversation_state(&self, state: &ConversationState) -> DbResult<()> {
        let conn = self.conn()?;
        let insights_json = serde_json::to_string(&state.insights)?;

        conn.execute(
            "INSERT INTO conversation_states
                (twin_id, current_phase, last_response_type, insights, parent_mentioned, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                state.twin_id,
                state.current_phase.as_str(),
                state.last_response_type.as_str(),
                insights_json,
                state.parent_mentioned,
                state.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Write the fields a transition produces. `insights` is left alone.
    pub fn update_conversation_state(&self, twin_id: &str, update: &StateUpdate) -> DbResult<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE conversation_states
             SET current_phase = ?1, last_response_type = ?2, parent_mentioned = ?3, updated_at = ?4
             WHERE twin_id = ?5",
            params![
                update.current_phase.as_str(),
                update.last_response_type.as_str(),
                update.parent_mentioned,
                update.updated_at.to_rfc3339(),
                twin_id,
            ],
        )?;

        if updated == 0 {
            return Err(DbError::StateNotFound(twin_id.to_string()));
        }
        Ok(())
    }

    /// Delete a twin's conversation state. Deleting a missing row is not an error.
    pub fn delete_conversation_state(&self, twin_id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM conversation_states WHERE twin_id = ?1",
            params![twin_id],
        )?;
        Ok(deleted > 0)
    }
}

fn insert_message(
    conn: &Connection,
    message_id: &str,
    twin_id: &str,
    content: &str,
    is_user: bool,
) -> DbResult<Message> {
    let now = Utc::now();

    let sequence_id: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM messages WHERE twin_id = ?1",
        params![twin_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO messages (id, twin_id, sequence_id, content, is_user, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![message_id, twin_id, sequence_id, content, is_user, now.to_rfc3339()],
    )?;

    conn.execute(
        "UPDATE twins SET updated_at = ?1 WHERE id = ?2",
        params![now.to_rfc3339(), twin_id],
    )?;

    Ok(Message {
        id: message_id.to_string(),
        twin_id: twin_id.to_string(),
        sequence_id,
        content: content.to_string(),
        is_user,
        created_at: now,
    })
}

/// Parse a message row from the database
fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        twin_id: row.get(1)?,
        sequence_id: row.get(2)?,
        content: row.get(3)?,
        is_user: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
