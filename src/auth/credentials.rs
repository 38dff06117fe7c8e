//! Password registration and login.
//!
//! Registration is open; the first account created becomes the admin, every
//! later one an employee. Admins can promote users afterwards via the user
//! management API.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::db::models::{User, USER_COLUMNS};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/register — Create an account and return a token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
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

        // First account bootstraps the admin role
        let user_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query: {}", e)))?;
        let role = if user_count == 0 { "admin" } else { "employee" };

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
            role: role.to_string(),
            created_at: now,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    let token = jwt::issue_access_token(&state.jwt_secret, &user.id, &user.email, user.is_admin())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Token: {}", e)))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /api/auth/login — Verify credentials and return a token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let email = req.email.trim().to_lowercase();

    let found = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
                [&email],
                |row| {
                    let user = User::from_row(row)?;
                    let hash: String = row.get(5)?;
                    Ok((user, hash))
                },
            )
            .ok();
        Ok::<_, (StatusCode, String)>(row)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    // Same response for unknown email and wrong password
    let (user, password_hash) = found.ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
    })?;

    let valid = bcrypt::verify(&req.password, &password_hash)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Verify: {}", e)))?;
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    let token = jwt::issue_access_token(&state.jwt_secret, &user.id, &user.email, user.is_admin())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Token: {}", e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/user — Profile of the authenticated user.
pub async fn current_user(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<User>, (StatusCode, String)> {
    crate::users::crud::load_user(&state.db, &claims.sub).await
}
