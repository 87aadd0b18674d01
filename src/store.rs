/*!
 * The live message buffer.
 *
 * The MessageStore owns the authoritative list of live messages and is the only thing allowed to
 * change it. Readers get snapshots, so a fetch that replaces the buffer is never seen half done.
 */
use crate::{
    error::RemoteError,
    message::{Message, MessageKey},
    remote::RemoteSource,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rustc_hash::FxHashSet as HashSet;
use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

pub use poller::{Poller, DEFAULT_POLL_INTERVAL};

mod poller;

/// The most messages the live buffer will hold.
pub const MAX_BUFFERED_MESSAGES: usize = 200;

static_assertions::const_assert!(MAX_BUFFERED_MESSAGES > 0);

#[derive(Debug, Default)]
struct StoreState {
    messages: VecDeque<Message>,
    loading: bool,
    error: Option<String>,
    last_synced: Option<DateTime<Utc>>,
}

/**
 * The live message buffer and the narrow set of operations that mutate it.
 *
 * All mutation goes through `&self` methods guarded by a lock, so a store can be shared between a
 * poller thread and any number of readers inside an `Arc`.
 */
pub struct MessageStore {
    remote: Box<dyn RemoteSource>,
    state: RwLock<StoreState>,
}

impl MessageStore {
    /// Create an empty store that syncs with the given remote.
    pub fn new<R: RemoteSource + 'static>(remote: R) -> Self {
        MessageStore {
            remote: Box::new(remote),
            state: RwLock::new(StoreState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /**
     * Replace the buffer with the remote's current list.
     *
     * On failure the buffer is left alone and the error state is set. The loading flag is cleared
     * on every way out of this function.
     *
     * #Returns
     * The number of messages now in the buffer.
     */
    pub fn fetch_all(&self) -> Result<usize, RemoteError> {
        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
        }
        let _loading = LoadingGuard(self);

        match self.remote.fetch_messages() {
            Ok(messages) => {
                let fetched = messages.len();
                let messages = dedup_and_bound(messages);
                let count = messages.len();

                let mut state = self.write();
                state.messages = messages;
                state.last_synced = Some(Utc::now());

                if count != fetched {
                    debug!("fetched {} messages, kept {}", fetched, count);
                } else {
                    debug!("fetched {} messages", count);
                }

                Ok(count)
            }
            Err(err) => {
                warn!("Error fetching messages: {}", err);
                self.write().error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /**
     * Add one message unless one with the same (source node, message id) is already buffered.
     *
     * When the buffer grows past its capacity the oldest messages are dropped.
     *
     * #Returns
     * true if the message was added.
     */
    pub fn append_one(&self, message: Message) -> bool {
        let mut state = self.write();

        if state.messages.iter().any(|m| m.key() == message.key()) {
            debug!(
                "ignoring duplicate message {}/{}",
                message.source_node(),
                message.message_id()
            );
            return false;
        }

        state.messages.push_back(message);

        while state.messages.len() > MAX_BUFFERED_MESSAGES {
            if let Some(evicted) = state.messages.pop_front() {
                debug!(
                    "buffer full, evicted {}/{}",
                    evicted.source_node(),
                    evicted.message_id()
                );
            }
        }

        true
    }

    /**
     * Clear the remote, and only if that worked, the local buffer.
     *
     * A failed remote clear leaves the buffer as it was so the view never claims to be cleared
     * when the server still has the data.
     */
    pub fn clear_all(&self) -> Result<(), RemoteError> {
        match self.remote.clear_messages() {
            Ok(()) => {
                let mut state = self.write();
                state.messages.clear();
                state.error = None;
                info!("cleared all messages");
                Ok(())
            }
            Err(err) => {
                warn!("Error clearing messages: {}", err);
                self.write().error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Tell the remote a record was handled. Failures are logged and otherwise ignored.
    pub fn acknowledge(&self, log_id: &str) {
        match self.remote.mark_rescued(log_id) {
            Ok(()) => debug!("marked {} as rescued", log_id),
            Err(err) => warn!("Error marking {} as rescued: {}", log_id, err),
        }
    }

    /// Forget everything locally, without telling the remote.
    pub fn reset(&self) {
        let mut state = self.write();
        state.messages.clear();
        state.error = None;
        state.loading = false;
        state.last_synced = None;
    }

    /// A copy of the current buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.read().messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().messages.is_empty()
    }

    /// The error from the most recent fetch or clear, if it failed.
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// When the buffer was last replaced by a successful fetch.
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.read().last_synced
    }
}

struct LoadingGuard<'a>(&'a MessageStore);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.write().loading = false;
    }
}

/// Keep the first of any messages sharing a key, then keep only the newest that fit.
fn dedup_and_bound(messages: Vec<Message>) -> VecDeque<Message> {
    let keep: Vec<bool> = {
        let mut seen: HashSet<MessageKey> = HashSet::default();
        messages.iter().map(|m| seen.insert(m.key())).collect()
    };

    let mut unique: VecDeque<Message> = messages
        .into_iter()
        .zip(keep)
        .filter_map(|(m, keep)| if keep { Some(m) } else { None })
        .collect();

    while unique.len() > MAX_BUFFERED_MESSAGES {
        unique.pop_front();
    }

    unique
}
