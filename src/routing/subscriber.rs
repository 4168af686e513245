//! Route update subscriber
//!
//! A long-lived background task subscribed to the store's update channel.
//! Each message drops and/or inserts one local route entry. Malformed
//! messages are skipped; only a failure of the subscription itself ends
//! the loop, and the supervisor restarts it a bounded number of times
//! before the proxy falls back to cached and control-plane routes for the
//! rest of its life.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::error::{ProxyError, Result};

use super::directory::{RouteUpdate, RoutingDirectory};

/// Maximum subscriber restarts before giving up.
const MAX_RESTARTS: u32 = 5;

/// Ramped restart delay, capped at one second.
fn restart_delay(attempt: u32) -> Duration {
    Duration::from_millis(((attempt as u64) * 200).min(1000))
}

/// Subscribes to the route update channel and applies every event to the
/// directory.
pub struct InvalidationSubscriber {
    client: redis::Client,
    channel: String,
    directory: Arc<RoutingDirectory>,
}

impl InvalidationSubscriber {
    pub fn new(
        client: redis::Client,
        channel: impl Into<String>,
        directory: Arc<RoutingDirectory>,
    ) -> Self {
        Self {
            client,
            channel: channel.into(),
            directory,
        }
    }

    /// Subscribe and loop on messages until the subscription fails.
    pub async fn run(&self) -> Result<()> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        info!("subscribed to route updates on {}", self.channel);

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("undecodable route update payload: {}", e);
                    continue;
                }
            };
            apply_payload(&self.directory, &payload);
        }

        Err(ProxyError::Store("route update subscription closed".into()))
    }

    /// Spawn the subscriber under a restart supervisor.
    pub fn spawn_supervised(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut attempts = 0u32;
            loop {
                let err = match self.run().await {
                    Ok(()) => return,
                    Err(err) => err,
                };

                attempts += 1;
                if attempts > MAX_RESTARTS {
                    error!(
                        "route update subscriber failed permanently after {} restarts: {}; \
                         continuing on cached and control-plane routes",
                        MAX_RESTARTS, err
                    );
                    return;
                }
                let delay = restart_delay(attempts);
                warn!(
                    "route update subscriber error: {}; restarting in {:?} (attempt {})",
                    err, delay, attempts
                );
                tokio::time::sleep(delay).await;
            }
        })
    }
}

/// Parse one channel message and apply it to the directory.
///
/// Malformed messages are logged and dropped; they never end the
/// subscription. Returns whether the message was applied.
fn apply_payload(directory: &RoutingDirectory, payload: &str) -> bool {
    match serde_json::from_str::<RouteUpdate>(payload) {
        Ok(update) => {
            directory.apply_update(&update);
            true
        }
        Err(e) => {
            warn!("malformed route update message: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;
    use crate::routing::ControlPlaneClient;
    use crate::routing::RouteStore;

    use async_trait::async_trait;

    struct EmptyStore;

    #[async_trait]
    impl RouteStore for EmptyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn empty_directory() -> RoutingDirectory {
        RoutingDirectory::new(
            Arc::new(EmptyStore),
            ControlPlaneClient::new("http://127.0.0.1:9", "tok"),
        )
    }

    #[tokio::test]
    async fn test_apply_payload_inserts_route() {
        let directory = empty_directory();
        let applied = apply_payload(
            &directory,
            r#"{"old_key":"","new_key":"alice:pw","backend_url":"10.0.0.5:5672"}"#,
        );
        assert!(applied);
        assert_eq!(
            directory.resolve("alice", "pw").await.unwrap(),
            "10.0.0.5:5672"
        );
    }

    #[tokio::test]
    async fn test_apply_payload_skips_malformed_message() {
        let directory = empty_directory();
        assert!(!apply_payload(&directory, "not json at all"));
        // Nothing was inserted; resolution still fails.
        let err = directory.resolve("alice", "pw").await.unwrap_err();
        assert!(matches!(err, ProxyError::Resolution(_)));
    }

    #[test]
    fn test_restart_delay_ramps_and_caps() {
        assert_eq!(restart_delay(1), Duration::from_millis(200));
        assert_eq!(restart_delay(3), Duration::from_millis(600));
        assert_eq!(restart_delay(5), Duration::from_millis(1000));
        assert_eq!(restart_delay(50), Duration::from_millis(1000));
    }
}
