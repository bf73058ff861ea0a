//! One-shot waits for a future event, see [`Client::wait_for`](crate::client::Client::wait_for).

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{sync::oneshot, time::timeout};

use crate::{error::MelisaError, websocket::event_handler::Event};

type Check = Box<dyn Fn(&Event) -> bool + Send + Sync>;

struct Waiter {
    id: u64,
    event_name: String,
    check: Check,
    tx: oneshot::Sender<Event>,
}

#[derive(Default)]
struct WaiterList {
    next_id: u64,
    waiters: Vec<Waiter>,
}

/// `"on_message_create"`, `"message_create"` and `"MESSAGE_CREATE"` all
/// name the same event.
fn normalize(event_name: &str) -> String {
    let lower = event_name.to_ascii_lowercase();
    lower.strip_prefix("on_").unwrap_or(lower.as_str()).to_string()
}

#[derive(Clone, Default)]
pub struct Waiters {
    inner: Arc<Mutex<WaiterList>>,
}

impl Debug for Waiters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiters").field("pending", &self.len()).finish()
    }
}

impl Waiters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, event_name: &str, check: Check) -> (u64, oneshot::Receiver<Event>) {
        let (tx, rx) = oneshot::channel();
        let mut list = self.inner.lock();
        let id = list.next_id;
        list.next_id += 1;
        list.waiters.push(Waiter {
            id,
            event_name: normalize(event_name),
            check,
            tx,
        });
        (id, rx)
    }

    fn remove(&self, id: u64) {
        self.inner.lock().waiters.retain(|w| w.id != id);
    }

    /// Resolve every waiter that wants `event`. Returns how many were resolved.
    pub fn notify(&self, event: &Event) -> usize {
        let name = normalize(event.name());
        let ready: Vec<Waiter> = {
            let mut list = self.inner.lock();
            let (ready, pending) = std::mem::take(&mut list.waiters)
                .into_iter()
                .partition(|w| w.event_name == name && (w.check)(event));
            list.waiters = pending;
            ready
        };

        let count = ready.len();
        for waiter in ready {
            let _ = waiter.tx.send(event.clone());
        }
        count
    }

    /// Wait for the first `event_name` event accepted by `check`.
    pub async fn wait_for<F>(
        &self,
        event_name: &str,
        check: F,
        wait: Duration,
    ) -> Result<Event, MelisaError>
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let (id, rx) = self.register(event_name, Box::new(check));
        let result = timeout(wait, rx).await;
        self.remove(id);

        match result {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(MelisaError::Other(format!(
                "waiter for `{event_name}` was dropped"
            ))),
            Err(_) => Err(MelisaError::Timeout(event_name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_matching_event() {
        let waiters = Waiters::new();
        let task = tokio::spawn({
            let waiters = waiters.clone();
            async move {
                waiters
                    .wait_for(
                        "on_shard_ready",
                        |e| matches!(e, Event::ShardReady(2)),
                        Duration::from_secs(5),
                    )
                    .await
            }
        });

        while waiters.is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(waiters.notify(&Event::ShardReady(1)), 0);
        assert_eq!(waiters.notify(&Event::ShardReady(2)), 1);

        let event = task.await.unwrap().unwrap();
        assert!(matches!(event, Event::ShardReady(2)));
        assert!(waiters.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_cleans_up() {
        let waiters = Waiters::new();
        let err = waiters
            .wait_for("message_create", |_| true, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, MelisaError::Timeout(name) if name == "message_create"));
        assert!(waiters.is_empty());
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize("on_message_create"), "message_create");
        assert_eq!(normalize("MESSAGE_CREATE"), "message_create");
    }
}
