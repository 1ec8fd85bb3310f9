//! Connection registry keyed by server identity.
//!
//! The registry holds at most one live connection per server name. Lookup and
//! insert are serialized per name so concurrent opens dial exactly once.
//! Closing a connection tears the transport down but leaves it registered;
//! commands sent to it afterwards fail at session allocation.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::Result;
use super::server::Server;
use super::transport::{Dialer, Transport};
use super::types::ConnectionInfo;

/// A registered connection and the lock that keeps its commands in sequence.
pub struct Connection<T> {
    info: ConnectionInfo,
    transport: T,
    exec_lock: Mutex<()>,
}

impl<T: Transport> Connection<T> {
    fn new(server: &Server, transport: T) -> Self {
        Self {
            info: ConnectionInfo {
                connection_id: Uuid::new_v4().to_string(),
                server_name: server.name().to_string(),
                address: server.full_address(),
                user: server.user().to_string(),
                connected_at: chrono::Utc::now().to_rfc3339(),
            },
            transport,
            exec_lock: Mutex::new(()),
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn server_name(&self) -> &str {
        &self.info.server_name
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Wait for any in-flight command on this connection to finish.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.exec_lock.lock().await
    }
}

/// Registry of live connections, one per server name.
pub struct ConnectionManager<D: Dialer> {
    dialer: D,
    connections: DashMap<String, Arc<Connection<D::Transport>>>,
    open_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<D: Dialer> ConnectionManager<D> {
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            connections: DashMap::new(),
            open_locks: DashMap::new(),
        }
    }

    pub fn dialer(&self) -> &D {
        &self.dialer
    }

    /// Make sure `server` has a registered connection.
    ///
    /// Returns the existing connection when one is registered under the
    /// server's name, without dialing.
    pub async fn open(&self, server: &Server) -> Result<Arc<Connection<D::Transport>>> {
        if let Some(existing) = self.get(server.name()) {
            debug!("Reusing connection to {}", server.name());
            return Ok(existing);
        }

        let open_lock = self
            .open_locks
            .entry(server.name().to_string())
            .or_default()
            .clone();
        let guard = open_lock.lock().await;
        let outcome = self.dial_and_register(server).await;
        drop(guard);
        drop(open_lock);

        // Last one out removes the lock; a waiter still holds a clone.
        self.open_locks
            .remove_if(server.name(), |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    async fn dial_and_register(&self, server: &Server) -> Result<Arc<Connection<D::Transport>>> {
        // Another task may have finished dialing while we waited.
        if let Some(existing) = self.get(server.name()) {
            debug!("Reusing connection to {}", server.name());
            return Ok(existing);
        }

        let transport = self.dialer.dial(server).await?;
        let connection = Arc::new(Connection::new(server, transport));
        self.connections
            .insert(server.name().to_string(), connection.clone());

        info!(
            "Registered connection {} for {} ({}@{})",
            connection.info.connection_id,
            server.name(),
            server.user(),
            server.full_address()
        );
        Ok(connection)
    }

    /// Open every server that is not connected yet, concurrently.
    ///
    /// Failures are logged and skipped. Returns how many connections were
    /// newly opened.
    pub async fn open_all(&self, servers: &[Server]) -> usize {
        let mut seen = HashSet::new();
        let pending: Vec<&Server> = servers
            .iter()
            .filter(|server| !self.contains(server.name()))
            .filter(|server| seen.insert(server.name()))
            .collect();

        let results = join_all(pending.iter().map(|server| async move {
            (server.name(), self.open(server).await)
        }))
        .await;

        let mut opened = 0;
        for (name, result) in results {
            match result {
                Ok(_) => opened += 1,
                Err(e) => warn!("Skipping {}: {}", name, e),
            }
        }

        info!("Opened {} of {} pending connections", opened, pending.len());
        opened
    }

    /// Tear down the connection's transport.
    ///
    /// The registry entry stays; later commands on it fail with a session
    /// error.
    pub async fn close(&self, connection: &Connection<D::Transport>) -> Result<()> {
        info!(
            "Closing connection {} to {}",
            connection.info.connection_id, connection.info.server_name
        );
        connection.transport.close().await
    }

    /// Snapshot of every registered connection.
    pub fn list(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Connection<D::Transport>>> {
        self.connections.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::error::Error;
    use crate::remote::testing::ScriptedDialer;
    use std::time::Duration;

    fn server(name: &str) -> Server {
        Server::new(name, "10.0.0.5", "alice").with_password("secret123")
    }

    mod open {
        use super::*;

        #[tokio::test]
        async fn test_open_registers_connection() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            let connection = manager.open(&server("web")).await.unwrap();

            assert_eq!(connection.server_name(), "web");
            assert_eq!(connection.info().address, "10.0.0.5:22");
            assert_eq!(connection.info().user, "alice");
            assert!(manager.contains("web"));
            assert_eq!(manager.len(), 1);
        }

        #[tokio::test]
        async fn test_open_twice_dials_once() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            let first = manager.open(&server("web")).await.unwrap();
            let second = manager.open(&server("web")).await.unwrap();

            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(manager.len(), 1);
            assert_eq!(manager.dialer().script.dials(), 1);
            assert!(manager.open_locks.is_empty());
        }

        #[tokio::test]
        async fn test_concurrent_opens_dial_once() {
            let dialer = ScriptedDialer::new().with_delay(Duration::from_millis(20));
            let manager = Arc::new(ConnectionManager::new(dialer));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let manager = manager.clone();
                    tokio::spawn(async move { manager.open(&server("web")).await.map(|_| ()) })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            assert_eq!(manager.len(), 1);
            assert_eq!(manager.dialer().script.dials(), 1);
            assert!(manager.open_locks.is_empty());
        }

        #[tokio::test]
        async fn test_same_address_different_names() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            manager.open(&server("web")).await.unwrap();
            manager.open(&server("web-admin")).await.unwrap();

            assert_eq!(manager.len(), 2);
            assert_eq!(manager.dialer().script.dials(), 2);
        }

        #[tokio::test]
        async fn test_dial_failure_registers_nothing() {
            let manager = ConnectionManager::new(ScriptedDialer::new().failing_for("db"));
            let err = manager.open(&server("db")).await.err().unwrap();

            assert!(matches!(err, Error::Connection { ref server, .. } if server == "db"));
            assert!(manager.is_empty());
            assert!(manager.get("db").is_none());
            assert!(manager.open_locks.is_empty());
        }

        #[tokio::test]
        async fn test_concurrent_failed_opens_release_lock() {
            let dialer = ScriptedDialer::new()
                .failing_for("db")
                .with_delay(Duration::from_millis(10));
            let manager = Arc::new(ConnectionManager::new(dialer));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let manager = manager.clone();
                    tokio::spawn(async move { manager.open(&server("db")).await.is_err() })
                })
                .collect();
            for handle in handles {
                assert!(handle.await.unwrap());
            }

            assert!(manager.is_empty());
            assert!(manager.open_locks.is_empty());
        }
    }

    mod open_all {
        use super::*;

        #[tokio::test]
        async fn test_open_all_skips_failures() {
            let manager = ConnectionManager::new(ScriptedDialer::new().failing_for("db"));
            let servers = vec![server("web"), server("db"), server("cache")];

            let opened = manager.open_all(&servers).await;

            assert_eq!(opened, 2);
            assert!(manager.contains("web"));
            assert!(manager.contains("cache"));
            assert!(!manager.contains("db"));
        }

        #[tokio::test]
        async fn test_open_all_counts_only_new() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            manager.open(&server("web")).await.unwrap();

            let servers = vec![server("web"), server("cache"), server("cache")];
            let opened = manager.open_all(&servers).await;

            assert_eq!(opened, 1);
            assert_eq!(manager.len(), 2);
            assert_eq!(manager.dialer().script.dials(), 2);
        }

        #[tokio::test]
        async fn test_open_all_empty() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            assert_eq!(manager.open_all(&[]).await, 0);
            assert!(manager.is_empty());
        }
    }

    mod close {
        use super::*;

        #[tokio::test]
        async fn test_close_keeps_registry_entry() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            let connection = manager.open(&server("web")).await.unwrap();

            manager.close(&connection).await.unwrap();

            assert!(connection.transport().is_closed());
            assert!(manager.contains("web"));
            assert_eq!(manager.list().len(), 1);
        }

        #[tokio::test]
        async fn test_closed_connection_fails_at_session() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            let connection = manager.open(&server("web")).await.unwrap();
            manager.close(&connection).await.unwrap();

            let err = connection.transport().run("true", "\n").await.err().unwrap();
            assert!(matches!(err, Error::Session(_)));

            // Reopening finds the stale entry and does not redial.
            manager.open(&server("web")).await.unwrap();
            assert_eq!(manager.dialer().script.dials(), 1);
        }
    }

    mod list {
        use super::*;

        #[tokio::test]
        async fn test_list_snapshot() {
            let manager = ConnectionManager::new(ScriptedDialer::new());
            manager.open(&server("web")).await.unwrap();
            manager.open(&server("cache")).await.unwrap();

            let mut names: Vec<String> = manager
                .list()
                .into_iter()
                .map(|info| info.server_name)
                .collect();
            names.sort();
            assert_eq!(names, vec!["cache", "web"]);

            let ids: HashSet<String> = manager
                .list()
                .into_iter()
                .map(|info| info.connection_id)
                .collect();
            assert_eq!(ids.len(), 2);
        }
    }
}
