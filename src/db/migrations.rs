use rusqlite_migration::{Migrations, M};

/// Schema migrations, applied in order at startup.
/// Only user records are persisted; all signaling state is in-memory.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE users (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL DEFAULT 'employee'
                          CHECK (role IN ('admin', 'employee')),
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX idx_users_email ON users(email);
        "#,
    )])
}
