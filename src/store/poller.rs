use crate::{store::MessageStore, SkaiNetResult};
use crossbeam_channel::{bounded, select, tick, Sender};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

/// How often the dashboard re-syncs with the server by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/**
 * Periodically re-sync a MessageStore with its remote on a background thread.
 *
 * The first fetch happens as soon as the poller starts. Fetches never overlap: the ticker holds at
 * most one pending tick, so ticks that arrive while a fetch is running collapse into one.
 *
 * Stopping does not abort a fetch that is already in flight, it just makes sure no new one starts.
 */
pub struct Poller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `store` every `interval`.
    pub fn start(store: Arc<MessageStore>, interval: Duration) -> SkaiNetResult<Self> {
        Self::start_with(store, interval, |_store| {})
    }

    /// Start polling and call `on_cycle` after every fetch, whether or not it succeeded.
    pub fn start_with<F>(
        store: Arc<MessageStore>,
        interval: Duration,
        mut on_cycle: F,
    ) -> SkaiNetResult<Self>
    where
        F: FnMut(&MessageStore) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("skainet-poller".to_owned())
            .spawn(move || {
                let ticker = tick(interval);

                loop {
                    match store.fetch_all() {
                        Ok(count) => log::debug!("poll cycle complete, {} messages", count),
                        Err(err) => log::debug!("poll cycle failed: {}", err),
                    }
                    on_cycle(store.as_ref());

                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {}
                    }
                }

                log::debug!("poller stopped");
            })?;

        Ok(Poller {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop polling and wait for the polling thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the thread just like a message.
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("poller thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::test::{msg, FakeRemote};

    #[test]
    fn test_poller_fetches_until_stopped() {
        let remote = FakeRemote::default();
        remote.set_messages(vec![msg("1", "a")]);

        let store = Arc::new(MessageStore::new(remote.clone()));
        let (tx, rx) = crossbeam_channel::unbounded();

        let poller = Poller::start_with(store.clone(), Duration::from_millis(10), move |s| {
            let _ = tx.send(s.len());
        })
        .unwrap();

        // Immediate first fetch, then at least one ticked fetch.
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));
        remote.set_messages(vec![msg("1", "a"), msg("1", "b")]);
        let mut latest = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        while latest != 2 {
            latest = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }

        poller.stop();
        let fetches = *remote.fetches.lock().unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(*remote.fetches.lock().unwrap(), fetches);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_stop_does_not_wait_for_interval() {
        let store = Arc::new(MessageStore::new(FakeRemote::default()));
        let poller = Poller::start(store, Duration::from_secs(3600)).unwrap();

        let start = std::time::Instant::now();
        poller.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
