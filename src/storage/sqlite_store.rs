use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{hash_password, verify_password, Note, NoteDraft, NoteId, Session, User, UserId};
use crate::error::{NotekeeperError, Result};
use crate::slug::derive_slug;

pub const DEFAULT_DB: &str = "notekeeper.db";

/// SQLite store for users, sessions and notes
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.init_schema()?;
        Ok(store)
    }

    /// Location of the database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                date_joined TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_notes_owner ON notes(owner_id);
            ",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create a user with a hashed password
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;
        let date_joined = Utc::now();
        let inserted = self.conn.execute(
            "INSERT INTO users (username, password_hash, date_joined) VALUES (?1, ?2, ?3)",
            params![username, password_hash, date_joined],
        );
        match inserted {
            Ok(_) => Ok(User {
                id: self.conn.last_insert_rowid(),
                username: username.to_string(),
                date_joined,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(NotekeeperError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, date_joined FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, date_joined FROM users WHERE username = ?1",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Return the user if the password matches
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let row: Option<(User, String)> = self
            .conn
            .query_row(
                "SELECT id, username, date_joined, password_hash FROM users WHERE username = ?1",
                [username],
                |row| Ok((user_from_row(row)?, row.get(3)?)),
            )
            .optional()?;

        Ok(row.and_then(|(user, hash)| verify_password(password, &hash).then_some(user)))
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<Session> {
        let session = Session::new(user_id, ttl);
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.token.to_string(), session.user_id, session.expires_at],
        )?;
        Ok(session)
    }

    /// Resolve a session token to its user. Expired sessions are removed.
    pub fn session_user(&self, token: &Uuid) -> Result<Option<User>> {
        let token = token.to_string();
        let row: Option<(UserId, DateTime<Utc>)> = self
            .conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
                [&token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, expires_at)) if Utc::now() >= expires_at => {
                self.conn
                    .execute("DELETE FROM sessions WHERE token = ?1", [&token])?;
                Ok(None)
            }
            Some((user_id, _)) => self.get_user(user_id),
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token: &Uuid) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", [token.to_string()])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    pub fn count_notes(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Notes owned by `owner_id`, oldest first
    pub fn list_notes_for_owner(&self, owner_id: UserId) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, text, slug, owner_id FROM notes WHERE owner_id = ?1 ORDER BY id",
        )?;

        let notes = stmt
            .query_map([owner_id], note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    /// Look up a note by slug regardless of owner
    pub fn find_note_by_slug(&self, slug: &str) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                "SELECT id, title, text, slug, owner_id FROM notes WHERE slug = ?1",
                [slug],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Look up a note by slug, only if `owner_id` owns it
    pub fn get_owned_note(&self, slug: &str, owner_id: UserId) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                "SELECT id, title, text, slug, owner_id FROM notes WHERE slug = ?1 AND owner_id = ?2",
                params![slug, owner_id],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// True if some note other than `exclude` already uses `slug`
    pub fn slug_exists(&self, slug: &str, exclude: Option<NoteId>) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE slug = ?1 AND (?2 IS NULL OR id != ?2))",
            params![slug, exclude],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a note. An empty draft slug is derived from the title.
    pub fn insert_note(&self, owner_id: UserId, draft: &NoteDraft) -> Result<Note> {
        let slug = resolve_slug(draft)?;
        let inserted = self.conn.execute(
            "INSERT INTO notes (title, text, slug, owner_id) VALUES (?1, ?2, ?3, ?4)",
            params![draft.title, draft.text, slug, owner_id],
        );
        match inserted {
            Ok(_) => Ok(Note {
                id: self.conn.last_insert_rowid(),
                title: draft.title.clone(),
                text: draft.text.clone(),
                slug,
                owner_id,
            }),
            Err(e) if is_unique_violation(&e) => Err(NotekeeperError::SlugTaken(slug)),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert many notes for one owner in a single transaction
    pub fn insert_notes(&mut self, owner_id: UserId, drafts: &[NoteDraft]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notes (title, text, slug, owner_id) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for draft in drafts {
                let slug = resolve_slug(draft)?;
                stmt.execute(params![draft.title, draft.text, slug, owner_id])
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            NotekeeperError::SlugTaken(slug.clone())
                        } else {
                            e.into()
                        }
                    })?;
            }
        }
        tx.commit()?;
        Ok(drafts.len())
    }

    /// Replace title, text and slug of a note owned by `owner_id`
    pub fn update_note(&self, id: NoteId, owner_id: UserId, draft: &NoteDraft) -> Result<Note> {
        let slug = resolve_slug(draft)?;
        let changed = self.conn.execute(
            "UPDATE notes SET title = ?1, text = ?2, slug = ?3 WHERE id = ?4 AND owner_id = ?5",
            params![draft.title, draft.text, slug, id, owner_id],
        );
        match changed {
            Ok(0) => Err(NotekeeperError::NoteNotFound(id.to_string())),
            Ok(_) => Ok(Note {
                id,
                title: draft.title.clone(),
                text: draft.text.clone(),
                slug,
                owner_id,
            }),
            Err(e) if is_unique_violation(&e) => Err(NotekeeperError::SlugTaken(slug)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a note owned by `owner_id`. Returns false if nothing matched.
    pub fn delete_note(&self, id: NoteId, owner_id: UserId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(removed > 0)
    }
}

fn resolve_slug(draft: &NoteDraft) -> Result<String> {
    let slug = if draft.slug.is_empty() {
        derive_slug(&draft.title)
    } else {
        draft.slug.clone()
    };
    if slug.is_empty() {
        return Err(NotekeeperError::Invalid {
            field: "slug".to_string(),
            message: format!("cannot derive a slug from title '{}'", draft.title),
        });
    }
    Ok(slug)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        date_joined: row.get(2)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        slug: row.get(3)?,
        owner_id: row.get(4)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// Implement From for rusqlite::Error
impl From<rusqlite::Error> for NotekeeperError {
    fn from(e: rusqlite::Error) -> Self {
        NotekeeperError::Storage(format!("SQLite error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_users() -> (SqliteStore, User, User) {
        let store = SqliteStore::open_in_memory().unwrap();
        let author = store.create_user("Лев Толстой", "pw-author").unwrap();
        let reader = store.create_user("Читатель простой", "pw-reader").unwrap();
        (store, author, reader)
    }

    #[test]
    fn test_open_creates_db() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_DB);
        let _store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_DB);
        {
            let store = SqliteStore::open(&path).unwrap();
            let user = store.create_user("author", "pw").unwrap();
            store
                .insert_note(user.id, &NoteDraft::new("Title", "Text", "slug"))
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count_notes().unwrap(), 1);
        assert!(store.find_note_by_slug("slug").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_username() {
        let (store, _, _) = store_with_users();
        let err = store.create_user("Лев Толстой", "other").unwrap_err();
        assert!(matches!(err, NotekeeperError::UsernameTaken(name) if name == "Лев Толстой"));
    }

    #[test]
    fn test_authenticate() {
        let (store, author, _) = store_with_users();
        let found = store.authenticate("Лев Толстой", "pw-author").unwrap();
        assert_eq!(found.map(|u| u.id), Some(author.id));
        assert!(store.authenticate("Лев Толстой", "nope").unwrap().is_none());
        assert!(store.authenticate("nobody", "pw-author").unwrap().is_none());
    }

    #[test]
    fn test_session_roundtrip_and_logout() {
        let (store, author, _) = store_with_users();
        let session = store.create_session(author.id, Duration::hours(1)).unwrap();

        let user = store.session_user(&session.token).unwrap();
        assert_eq!(user.map(|u| u.id), Some(author.id));

        store.delete_session(&session.token).unwrap();
        assert!(store.session_user(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let (store, author, _) = store_with_users();
        let session = store.create_session(author.id, Duration::seconds(-1)).unwrap();
        assert!(store.session_user(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_list_is_filtered_by_owner() {
        let (mut store, author, reader) = store_with_users();
        let drafts: Vec<NoteDraft> = (0..10)
            .map(|i| NoteDraft::new("Заголовок", "Текст", format!("slug_{}", i)))
            .collect();
        assert_eq!(store.insert_notes(author.id, &drafts).unwrap(), 10);

        let notes = store.list_notes_for_owner(author.id).unwrap();
        assert_eq!(notes.len(), 10);
        assert!(notes.iter().all(|n| n.owner_id == author.id));
        assert!(store.list_notes_for_owner(reader.id).unwrap().is_empty());
    }

    #[test]
    fn test_bulk_insert_is_atomic() {
        let (mut store, author, _) = store_with_users();
        let drafts = vec![
            NoteDraft::new("a", "a", "same"),
            NoteDraft::new("b", "b", "same"),
        ];
        let err = store.insert_notes(author.id, &drafts).unwrap_err();
        assert!(matches!(err, NotekeeperError::SlugTaken(s) if s == "same"));
        assert_eq!(store.count_notes().unwrap(), 0);
    }

    #[test]
    fn test_insert_derives_empty_slug() {
        let (store, author, _) = store_with_users();
        let note = store
            .insert_note(author.id, &NoteDraft::new("Заголовок", "Текст", ""))
            .unwrap();
        assert_eq!(note.slug, "zagolovok");
    }

    #[test]
    fn test_underivable_slug_is_rejected() {
        let (mut store, author, _) = store_with_users();
        let draft = NoteDraft::new("!!!", "Текст", "");

        let err = store.insert_note(author.id, &draft).unwrap_err();
        assert!(matches!(err, NotekeeperError::Invalid { ref field, .. } if field == "slug"));

        let drafts = vec![NoteDraft::new("a", "a", "ok"), draft.clone()];
        assert!(store.insert_notes(author.id, &drafts).is_err());
        assert_eq!(store.count_notes().unwrap(), 0);

        let note = store
            .insert_note(author.id, &NoteDraft::new("a", "a", "a"))
            .unwrap();
        assert!(store.update_note(note.id, author.id, &draft).is_err());
        assert_eq!(store.find_note_by_slug("a").unwrap(), Some(note));
    }

    #[test]
    fn test_insert_duplicate_slug() {
        let (store, author, reader) = store_with_users();
        store
            .insert_note(author.id, &NoteDraft::new("a", "a", "slug"))
            .unwrap();
        let err = store
            .insert_note(reader.id, &NoteDraft::new("b", "b", "slug"))
            .unwrap_err();
        assert!(matches!(err, NotekeeperError::SlugTaken(s) if s == "slug"));
        assert_eq!(store.count_notes().unwrap(), 1);
    }

    #[test]
    fn test_slug_exists_excludes_self() {
        let (store, author, _) = store_with_users();
        let note = store
            .insert_note(author.id, &NoteDraft::new("a", "a", "slug"))
            .unwrap();
        assert!(store.slug_exists("slug", None).unwrap());
        assert!(!store.slug_exists("slug", Some(note.id)).unwrap());
        assert!(!store.slug_exists("other", None).unwrap());
    }

    #[test]
    fn test_owned_lookup() {
        let (store, author, reader) = store_with_users();
        store
            .insert_note(author.id, &NoteDraft::new("a", "a", "slug"))
            .unwrap();
        assert!(store.get_owned_note("slug", author.id).unwrap().is_some());
        assert!(store.get_owned_note("slug", reader.id).unwrap().is_none());
    }

    #[test]
    fn test_update_requires_owner() {
        let (store, author, reader) = store_with_users();
        let note = store
            .insert_note(author.id, &NoteDraft::new("Заголовок", "Текст", "slug"))
            .unwrap();

        let err = store
            .update_note(note.id, reader.id, &NoteDraft::new("x", "hacked", "slug"))
            .unwrap_err();
        assert!(matches!(err, NotekeeperError::NoteNotFound(_)));
        assert_eq!(store.find_note_by_slug("slug").unwrap(), Some(note.clone()));

        let updated = store
            .update_note(note.id, author.id, &NoteDraft::new("Заголовок", "Новый", "slug"))
            .unwrap();
        assert_eq!(updated.text, "Новый");
        assert_eq!(store.find_note_by_slug("slug").unwrap(), Some(updated));
    }

    #[test]
    fn test_delete_requires_owner() {
        let (store, author, reader) = store_with_users();
        let note = store
            .insert_note(author.id, &NoteDraft::new("a", "a", "slug"))
            .unwrap();

        assert!(!store.delete_note(note.id, reader.id).unwrap());
        assert_eq!(store.count_notes().unwrap(), 1);

        assert!(store.delete_note(note.id, author.id).unwrap());
        assert_eq!(store.count_notes().unwrap(), 0);
    }
}
