//! In-memory history backend.
//!
//! Behaves like a browser tab: a list of entries with a cursor, forward entries
//! discarded on push, and `popstate`/`hashchange` fired on traversal. Used by the
//! CLI and by tests.

use serde_json::Value;
use tokio::sync::mpsc;
use url::{Position, Url};

use crate::history::provider::{HistoryEvent, HistoryProvider, ListenerId, ProviderError};

#[derive(Debug, Clone)]
struct Entry {
    url: Url,
    state: Option<Value>,
}

pub struct MemoryHistory {
    entries: Vec<Entry>,
    cursor: usize,
    listeners: Vec<(ListenerId, mpsc::UnboundedSender<HistoryEvent>)>,
    next_listener: ListenerId,
    reject_writes: bool,
}

impl MemoryHistory {
    /// Open a history whose single entry is `location` (an absolute URL).
    pub fn new(location: &str) -> Result<Self, ProviderError> {
        let url = Url::parse(location).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            entries: vec![Entry { url, state: None }],
            cursor: 0,
            listeners: Vec::new(),
            next_listener: 0,
            reject_writes: false,
        })
    }

    /// Number of native entries, including forward ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Make every subsequent push/replace fail.
    pub fn reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }

    pub fn forward(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.traverse(self.cursor + 1);
        }
    }

    /// Follow an in-page anchor: a new entry without state, then `popstate` and
    /// `hashchange` as a browser would fire them.
    pub fn navigate_hash(&mut self, fragment: &str) {
        let mut url = self.entries[self.cursor].url.clone();
        url.set_fragment(Some(fragment.trim_start_matches('#')));
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Entry { url, state: None });
        self.traverse(self.cursor + 1);
    }

    fn traverse(&mut self, target: usize) {
        let old_location = self.entries[self.cursor].url.clone();
        self.cursor = target;
        let entry = self.entries[target].clone();

        self.emit(HistoryEvent::PopState {
            state: entry.state,
            location: entry.url.clone(),
        });
        if old_location[..Position::AfterQuery] == entry.url[..Position::AfterQuery]
            && old_location.fragment() != entry.url.fragment()
        {
            self.emit(HistoryEvent::HashChange {
                old_location,
                new_location: entry.url,
            });
        }
    }

    fn emit(&mut self, event: HistoryEvent) {
        self.listeners
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    fn resolve(&self, url: &str) -> Result<Url, ProviderError> {
        if self.reject_writes {
            return Err(ProviderError::Rejected(url.to_string()));
        }
        self.entries[self.cursor]
            .url
            .join(url)
            .map_err(|e| ProviderError::InvalidUrl(e.to_string()))
    }
}

impl HistoryProvider for MemoryHistory {
    fn push_state(&mut self, state: Value, url: &str) -> Result<(), ProviderError> {
        let url = self.resolve(url)?;
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Entry {
            url,
            state: Some(state),
        });
        self.cursor += 1;
        Ok(())
    }

    fn replace_state(&mut self, state: Value, url: &str) -> Result<(), ProviderError> {
        let url = self.resolve(url)?;
        self.entries[self.cursor] = Entry {
            url,
            state: Some(state),
        };
        Ok(())
    }

    fn back(&mut self) {
        if self.cursor > 0 {
            self.traverse(self.cursor - 1);
        }
    }

    fn location(&self) -> Url {
        self.entries[self.cursor].url.clone()
    }

    fn state(&self) -> Option<Value> {
        self.entries[self.cursor].state.clone()
    }

    fn add_listener(&mut self) -> (ListenerId, mpsc::UnboundedReceiver<HistoryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, tx));
        (id, rx)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener, _)| *listener != id);
    }
}
