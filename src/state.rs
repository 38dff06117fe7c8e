use std::sync::Arc;

use crate::db::DbPool;
use crate::signaling::registry::CallRegistry;
use crate::ws::ConnectionMap;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Active WebSocket connections by connection handle
    pub connections: ConnectionMap,
    /// Identity↔connection registry for call signaling
    pub calls: Arc<CallRegistry>,
}
