//! Identity registry: who is reachable on which connection.
//!
//! Bidirectional identity↔connection map, process-wide and ephemeral — it is
//! rebuilt from live connections as clients reconnect and re-register, and
//! nothing here survives a restart.
//!
//! Both directions live under a single mutex. The pair update must be atomic
//! relative to every resolve/unregister: with separate locks a reader could
//! observe an identity whose reverse entry is already gone.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ws::ConnId;

#[derive(Debug, Default)]
struct Inner {
    by_identity: HashMap<String, ConnId>,
    by_conn: HashMap<ConnId, String>,
}

/// Concurrently-safe bidirectional index of registered identities.
///
/// Callers never touch the underlying maps; the only operations are
/// [`register`](CallRegistry::register), [`resolve`](CallRegistry::resolve) and
/// [`unregister`](CallRegistry::unregister).
#[derive(Debug, Default)]
pub struct CallRegistry {
    inner: Mutex<Inner>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to `conn`, superseding any earlier binding on either
    /// side (last-writer-wins).
    ///
    /// A reconnect leaves a stale entry in each direction: the identity may
    /// have had an older connection, and the connection may have carried an
    /// older identity. Both stale inverses are removed here so the two maps
    /// stay a strict bijection.
    pub fn register(&self, identity: &str, conn: ConnId) {
        let mut inner = self.inner.lock().expect("call registry lock");

        if let Some(old_conn) = inner.by_identity.insert(identity.to_string(), conn) {
            if old_conn != conn {
                inner.by_conn.remove(&old_conn);
            }
        }
        if let Some(old_identity) = inner.by_conn.insert(conn, identity.to_string()) {
            if old_identity != identity && inner.by_identity.get(&old_identity) == Some(&conn) {
                inner.by_identity.remove(&old_identity);
            }
        }
    }

    /// Look up the live connection for `identity`.
    ///
    /// `None` is a normal outcome (target currently offline), not an error.
    pub fn resolve(&self, identity: &str) -> Option<ConnId> {
        self.inner
            .lock()
            .expect("call registry lock")
            .by_identity
            .get(identity)
            .copied()
    }

    /// Remove both directional entries for `conn`, returning the identity it
    /// carried. No-op (returns `None`) if the connection never registered or
    /// was already removed — closing an unregistered connection must not fail.
    pub fn unregister(&self, conn: ConnId) -> Option<String> {
        let mut inner = self.inner.lock().expect("call registry lock");

        let identity = inner.by_conn.remove(&conn)?;
        // Only drop the forward entry if it still points at this connection;
        // a re-registration on a newer connection must win.
        if inner.by_identity.get(&identity) == Some(&conn) {
            inner.by_identity.remove(&identity);
        }
        Some(identity)
    }

    /// Number of registered identities. Used for logging.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("call registry lock").by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve_both_directions() {
        let registry = CallRegistry::new();
        let conn = ConnId::fresh();

        registry.register("alice", conn);
        assert_eq!(registry.resolve("alice"), Some(conn));
        assert_eq!(registry.unregister(conn), Some("alice".to_string()));
        assert_eq!(registry.resolve("alice"), None);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = CallRegistry::new();
        let conn = ConnId::fresh();

        // Never registered: no-op.
        assert_eq!(registry.unregister(conn), None);

        registry.register("alice", conn);
        assert_eq!(registry.unregister(conn), Some("alice".to_string()));
        // Second unregister of the same handle: still a no-op.
        assert_eq!(registry.unregister(conn), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistration_supersedes_old_connection() {
        let registry = CallRegistry::new();
        let h1 = ConnId::fresh();
        let h2 = ConnId::fresh();

        registry.register("alice", h1);
        registry.register("alice", h2);

        assert_eq!(registry.resolve("alice"), Some(h2));
        // The stale reverse entry for h1 is gone: closing h1 later must not
        // disturb the new binding.
        assert_eq!(registry.unregister(h1), None);
        assert_eq!(registry.resolve("alice"), Some(h2));
    }

    #[test]
    fn connection_can_rebind_to_new_identity() {
        let registry = CallRegistry::new();
        let conn = ConnId::fresh();

        registry.register("alice", conn);
        registry.register("alice2", conn);

        assert_eq!(registry.resolve("alice2"), Some(conn));
        // The old forward entry must not linger.
        assert_eq!(registry.resolve("alice"), None);
        assert_eq!(registry.unregister(conn), Some("alice2".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn bijection_holds_across_interleaved_operations() {
        let registry = CallRegistry::new();
        let conns: Vec<ConnId> = (0..4).map(|_| ConnId::fresh()).collect();

        registry.register("alice", conns[0]);
        registry.register("bob", conns[1]);
        registry.register("carol", conns[2]);
        registry.register("bob", conns[3]); // bob reconnects
        registry.unregister(conns[2]); // carol leaves
        registry.unregister(conns[1]); // bob's dead connection closes late

        assert_eq!(registry.resolve("alice"), Some(conns[0]));
        assert_eq!(registry.resolve("bob"), Some(conns[3]));
        assert_eq!(registry.resolve("carol"), None);
        assert_eq!(registry.len(), 2);

        // Every remaining identity round-trips through the reverse map.
        assert_eq!(registry.unregister(conns[0]), Some("alice".to_string()));
        assert_eq!(registry.unregister(conns[3]), Some("bob".to_string()));
        assert!(registry.is_empty());
    }
}
