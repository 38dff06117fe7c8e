use rusqlite::Row;
use serde::Serialize;

/// A user record as returned by the API. The password hash never leaves the
/// database layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl User {
    /// Column order: id, name, email, role, created_at
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// SELECT list matching [`User::from_row`].
pub const USER_COLUMNS: &str = "id, name, email, role, created_at";
