use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use switchboard_server::config::{generate_config_template, Config};
use switchboard_server::signaling::registry::CallRegistry;
use switchboard_server::{auth, db, routes, state, ws};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "switchboard_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "switchboard_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Switchboard server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database (user records only; signaling state is ephemeral)
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // First-boot hint: the first registered account becomes the admin
    let user_count: i64 = {
        let conn = db.lock().expect("DB lock for user count");
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?
    };
    if user_count == 0 {
        tracing::info!("No users registered yet — the first account to register becomes admin");
    }

    // Build application state
    let app_state = state::AppState {
        db,
        jwt_secret,
        connections: ws::new_connection_map(),
        calls: Arc::new(CallRegistry::new()),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
