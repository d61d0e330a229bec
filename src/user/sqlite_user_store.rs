use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
};
use tracing::{debug, info};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("username", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("contact", &SqlType::Text, is_unique = true),
        sqlite_column!(
            "activated",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("verification_code", &SqlType::Text),
        sqlite_column!("verification_issued_at", &SqlType::Integer),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_user_email", "email"),
        ("idx_user_verification_code", "verification_code"),
    ],
};
const USER_PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

/// V 1
const CATEGORY_TABLE_V_1: Table = Table {
    name: "category",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "name"]],
    indices: &[("idx_category_user_id", "user_id")],
};
const JOURNAL_ENTRY_TABLE_V_1: Table = Table {
    name: "journal_entry",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "category_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "category",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_journal_entry_user_id", "user_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            CATEGORY_TABLE_V_1,
            JOURNAL_ENTRY_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            CATEGORY_TABLE_V_1.create(conn)?;
            JOURNAL_ENTRY_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

const USER_COLUMNS: &str = "id, email, username, contact, activated, created";
const VERIFICATION_COLUMNS: &str =
    "id, email, username, verification_code, verification_issued_at, activated";
const ENTRY_SELECT: &str = "SELECT e.id, e.title, e.content, e.category_id, c.name, e.created \
     FROM journal_entry e LEFT JOIN category c ON c.id = e.category_id";

fn datetime_from_column(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Verification issue times are stored in nanoseconds so expiry checks
/// compare against exactly what was written.
fn issued_at_to_column(issued_at: DateTime<Utc>) -> Result<i64> {
    issued_at
        .timestamp_nanos_opt()
        .with_context(|| format!("Issue time {} is out of range", issued_at))
}

fn issued_at_from_column(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        contact: row.get(3)?,
        activated: row.get::<_, i64>(4)? != 0,
        created: datetime_from_column(row.get(5)?),
    })
}

fn verification_from_row(row: &Row) -> rusqlite::Result<VerificationRecord> {
    Ok(VerificationRecord {
        user_id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        code: row.get(3)?,
        issued_at: row.get::<_, Option<i64>>(4)?.map(issued_at_from_column),
        activated: row.get::<_, i64>(5)? != 0,
    })
}

fn entry_from_row(row: &Row) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category_id: row.get(3)?,
        category: row.get(4)?,
        date: datetime_from_column(row.get(5)?),
    })
}

fn auth_token_from_row(row: &Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get(0)?,
        value: AuthTokenValue(row.get(1)?),
        created: datetime_from_column(row.get(2)?),
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(&db_path, VERSIONED_SCHEMAS)
            .with_context(|| format!("Failed to open user db {:?}", db_path.as_ref()))?;
        info!("User db ready at {:?}", db_path.as_ref());
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_user(&self, where_clause: &str, value: &dyn ToSql) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM user WHERE {}", USER_COLUMNS, where_clause),
            params![value],
            user_from_row,
        )
        .optional()
        .context("Failed to read user")
    }

    fn query_verification(
        &self,
        where_clause: &str,
        value: &dyn ToSql,
    ) -> Result<Option<VerificationRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM user WHERE {}",
                VERIFICATION_COLUMNS, where_clause
            ),
            params![value],
            verification_from_row,
        )
        .optional()
        .context("Failed to read verification record")
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: &NewUser) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO user (email, username, contact, verification_code, verification_issued_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_user.email,
                new_user.username,
                new_user.contact,
                new_user.verification_code,
                issued_at_to_column(new_user.verification_issued_at)?,
            ],
        )
        .with_context(|| format!("Failed to create user {}", new_user.email))?;
        let user_id = tx.last_insert_rowid() as usize;
        tx.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                new_user.credentials.salt,
                new_user.credentials.hash,
                new_user.credentials.hasher.to_string(),
            ],
        )
        .context("Failed to store password credentials")?;
        tx.commit()?;
        debug!("Created user {} with id {}", new_user.email, user_id);
        Ok(user_id)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        self.query_user("id = ?1", &user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email = ?1", &email)
    }

    fn get_password_credentials(&self, user_id: usize) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT salt, hash, hasher FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((salt, hash, hasher)) => Ok(Some(PasswordCredentials {
                salt,
                hash,
                hasher: JournHasher::from_str(&hasher)?,
            })),
        }
    }

    fn update_password_credentials(
        &self,
        user_id: usize,
        credentials: &PasswordCredentials,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_password_credentials SET salt = ?1, hash = ?2, hasher = ?3 WHERE user_id = ?4",
            params![
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                user_id
            ],
        )
        .with_context(|| format!("Failed to update password of user {}", user_id))?;
        Ok(())
    }

    fn update_user_details(&self, user_id: usize, update: &UserDetailsUpdate) -> Result<bool> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();
        if let Some(email) = &update.email {
            assignments.push("email = ?");
            values.push(email);
        }
        if let Some(username) = &update.username {
            assignments.push("username = ?");
            values.push(username);
        }
        if let Some(phone_number) = &update.phone_number {
            assignments.push("contact = ?");
            values.push(phone_number);
        }
        if assignments.is_empty() {
            return Ok(self.get_user(user_id)?.is_some());
        }
        values.push(&user_id);

        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                &format!("UPDATE user SET {} WHERE id = ?", assignments.join(", ")),
                values.as_slice(),
            )
            .with_context(|| format!("Failed to update details of user {}", user_id))?;
        Ok(changed > 0)
    }
}

impl UserVerificationStore for SqliteUserStore {
    fn get_verification_by_email(&self, email: &str) -> Result<Option<VerificationRecord>> {
        self.query_verification("email = ?1", &email)
    }

    fn get_verification_by_code(&self, code: &str) -> Result<Option<VerificationRecord>> {
        self.query_verification("verification_code = ?1", &code)
    }

    fn set_verification_code(
        &self,
        user_id: usize,
        code: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<bool> {
        let issued_at = issued_at_to_column(issued_at)?;
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE user SET verification_code = ?1, verification_issued_at = ?2 \
                 WHERE id = ?3 AND activated = 0",
                params![code, issued_at, user_id],
            )
            .with_context(|| format!("Failed to store verification code for user {}", user_id))?;
        Ok(changed == 1)
    }

    fn activate_user(&self, user_id: usize, code: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE user SET activated = 1 WHERE id = ?1 AND activated = 0 AND verification_code = ?2",
            params![user_id, code],
        )?;
        Ok(changed == 1)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn add_auth_token(&self, token: &AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created) VALUES (?1, ?2, ?3)",
            params![token.user_id, token.value.0, token.created.timestamp()],
        )?;
        Ok(())
    }

    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created FROM auth_token WHERE value = ?1",
                params![value.0],
                auth_token_from_row,
            )
            .optional()?)
    }

    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let token = match self.get_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_token WHERE value = ?1", params![value.0])?;
        Ok(Some(token))
    }

    fn prune_auth_tokens_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE created < ?1",
            params![cutoff.timestamp()],
        )?;
        Ok(deleted)
    }
}

impl JournalStore for SqliteUserStore {
    fn create_category(&self, user_id: usize, name: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO category (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )
        .with_context(|| format!("Failed to create category {}", name))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_category(&self, user_id: usize, category_id: usize) -> Result<Option<Category>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, name FROM category WHERE id = ?1 AND user_id = ?2",
                params![category_id, user_id],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_categories(&self, user_id: usize) -> Result<Vec<Category>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name FROM category WHERE user_id = ?1 ORDER BY name")?;
        let categories = stmt
            .query_map(params![user_id], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn rename_category(&self, user_id: usize, category_id: usize, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE category SET name = ?1 WHERE id = ?2 AND user_id = ?3",
                params![name, category_id, user_id],
            )
            .with_context(|| format!("Failed to rename category {}", category_id))?;
        Ok(changed > 0)
    }

    fn delete_category(&self, user_id: usize, category_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            params![category_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn create_entry(&self, user_id: usize, entry: &NewJournalEntry) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO journal_entry (user_id, category_id, title, content) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, entry.category_id, entry.title, entry.content],
        )
        .context("Failed to create journal entry")?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_entry(&self, user_id: usize, entry_id: usize) -> Result<Option<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("{} WHERE e.id = ?1 AND e.user_id = ?2", ENTRY_SELECT),
                params![entry_id, user_id],
                entry_from_row,
            )
            .optional()?)
    }

    fn get_entries(&self, user_id: usize, category_id: Option<usize>) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        let entries = match category_id {
            Some(category_id) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE e.user_id = ?1 AND e.category_id = ?2 ORDER BY e.created DESC, e.id DESC",
                    ENTRY_SELECT
                ))?;
                let rows = stmt.query_map(params![user_id, category_id], entry_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE e.user_id = ?1 ORDER BY e.created DESC, e.id DESC",
                    ENTRY_SELECT
                ))?;
                let rows = stmt.query_map(params![user_id], entry_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(entries)
    }

    fn update_entry(
        &self,
        user_id: usize,
        entry_id: usize,
        update: &JournalEntryUpdate,
    ) -> Result<bool> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();
        if let Some(title) = &update.title {
            assignments.push("title = ?");
            values.push(title);
        }
        if let Some(content) = &update.content {
            assignments.push("content = ?");
            values.push(content);
        }
        if let Some(category_id) = &update.category_id {
            assignments.push("category_id = ?");
            values.push(category_id);
        }
        if assignments.is_empty() {
            return Ok(self.get_entry(user_id, entry_id)?.is_some());
        }
        values.push(&entry_id);
        values.push(&user_id);

        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                &format!(
                    "UPDATE journal_entry SET {} WHERE id = ? AND user_id = ?",
                    assignments.join(", ")
                ),
                values.as_slice(),
            )
            .with_context(|| format!("Failed to update journal entry {}", entry_id))?;
        Ok(changed > 0)
    }

    fn delete_entry(&self, user_id: usize, entry_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM journal_entry WHERE id = ?1 AND user_id = ?2",
            params![entry_id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
