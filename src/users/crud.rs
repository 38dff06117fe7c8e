//! Admin user management: the user directory the call UI is driven from.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::{require_admin, Claims};
use crate::db::models::{User, USER_COLUMNS};
use crate::db::DbPool;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

fn default_role() -> String {
    "employee".to_string()
}

fn validate_role(role: &str) -> Result<(), (StatusCode, String)> {
    match role {
        "admin" | "employee" => Ok(()),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown role '{}', expected 'admin' or 'employee'", other),
        )),
    }
}

/// GET /api/users — List all users (admin only).
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();
    let users = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
            ))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Prepare: {}", e)))?;

        let rows: Vec<User> = stmt
            .query_map([], User::from_row)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, (StatusCode, String)>(rows)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(users))
}

/// POST /api/users — Create a user with an explicit role (admin only).
pub async fn create_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    require_admin(&claims)?;
    validate_role(&req.role)?;

    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name and email are required".to_string()));
    }
    if req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Hash: {}", e)))?;

    let db = state.db.clone();
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    let role = req.role.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [&email],
                |row| row.get(0),
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query: {}", e)))?;
        if exists {
            return Err((StatusCode::CONFLICT, "Email already registered".to_string()));
        }

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![id, name, email, password_hash, role, now],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert user: {}", e)))?;

        Ok::<_, (StatusCode, String)>(User {
            id,
            name,
            email,
            role,
            created_at: now,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %claims.sub, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/{id} — Update name/email/role/password (admin only).
pub async fn update_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, (StatusCode, String)> {
    require_admin(&claims)?;
    if let Some(role) = &req.role {
        validate_role(role)?;
    }
    // Demoting yourself would lock the last admin out mid-session
    if req.role.as_deref() == Some("employee") && user_id == claims.sub {
        return Err((
            StatusCode::FORBIDDEN,
            "Cannot demote your own account".to_string(),
        ));
    }

    let password_hash = match &req.password {
        Some(password) => {
            if password.len() < 8 {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "Password must be at least 8 characters".to_string(),
                ));
            }
            Some(
                bcrypt::hash(password, bcrypt::DEFAULT_COST)
                    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Hash: {}", e)))?,
            )
        }
        None => None,
    };

    let db = state.db.clone();
    let id = user_id.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let now = Utc::now().to_rfc3339();
        let changed = conn
            .execute(
                "UPDATE users SET
                     name = COALESCE(?1, name),
                     email = COALESCE(?2, email),
                     role = COALESCE(?3, role),
                     password_hash = COALESCE(?4, password_hash),
                     updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    req.name.as_ref().map(|n| n.trim()),
                    req.email.as_ref().map(|e| e.trim().to_lowercase()),
                    req.role,
                    password_hash,
                    now,
                    id
                ],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update user: {}", e)))?;
        if changed == 0 {
            return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
        }

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [&id],
            User::from_row,
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Reload user: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::info!(user_id = %user.id, updated_by = %claims.sub, "User updated");

    Ok(Json(user))
}

/// DELETE /api/users/{id} — Remove a user (admin only).
pub async fn delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_admin(&claims)?;

    if user_id == claims.sub {
        return Err((
            StatusCode::FORBIDDEN,
            "Cannot delete your own account".to_string(),
        ));
    }

    let db = state.db.clone();
    let id = user_id.clone();

    let deleted = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.execute("DELETE FROM users WHERE id = ?1", [&id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete user: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    if deleted == 0 {
        return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
    }

    tracing::info!(user_id = %user_id, deleted_by = %claims.sub, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/profile — Own profile, any authenticated user.
pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<User>, (StatusCode, String)> {
    load_user(&state.db, &claims.sub).await
}

/// Fetch a single user by id. Shared by the profile endpoints.
pub async fn load_user(db: &DbPool, user_id: &str) -> Result<Json<User>, (StatusCode, String)> {
    let db = db.clone();
    let id = user_id.to_string();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [&id],
            User::from_row,
        )
        .map_err(|_| (StatusCode::NOT_FOUND, "User not found".to_string()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(user))
}
