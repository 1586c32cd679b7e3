//! Bounded navigation stack.
//!
//! # Responsibilities
//! - Keep the most recent routes, newest last, bounded by `history.max_entries`
//! - Mirror every push/replace into the native history with the route as state
//! - Turn `popstate` and `hashchange` notifications into route changes
//!
//! # Design Decisions
//! - Every mutation serializes first, then writes the native entry, then touches
//!   the stack. A failure at any step leaves both sides as they were
//! - The native history is the source of truth for back/forward: a `popstate`
//!   replaces the top of the stack with the entry's route
//! - Hash-only changes update `line`/`hash` of the active source route in place

use std::collections::VecDeque;

use tokio::sync::mpsc;
use url::{Position, Url};

use crate::config::{NodesConfig, RouterConfig};
use crate::history::error::NavigationError;
use crate::history::provider::{HistoryEvent, HistoryProvider, ListenerId};
use crate::observability::metrics;
use crate::routing::codec::{parse_fragment, resolve_location, route_to_path, RouteContext};
use crate::routing::{RepoRoute, Route, SourceRoute};

/// Route change caused by the native history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryChange {
    /// Back/forward landed on another entry; the route needs loading.
    Replaced(Route),
    /// Only the line or anchor of the active source route changed.
    HashUpdated(Route),
}

pub struct NavigationHistory<P: HistoryProvider> {
    provider: P,
    nodes: NodesConfig,
    max_entries: usize,
    stack: VecDeque<Route>,
    listener: Option<(ListenerId, mpsc::UnboundedReceiver<HistoryEvent>)>,
}

impl<P: HistoryProvider> NavigationHistory<P> {
    pub fn new(provider: P, config: &RouterConfig) -> Self {
        Self {
            provider,
            nodes: config.nodes.clone(),
            max_entries: config.history.max_entries.max(1),
            stack: VecDeque::new(),
            listener: None,
        }
    }

    /// Read the current native entry, register for events and sync the entry.
    ///
    /// A reload keeps the stored route; an entry without a usable state is
    /// decoded from its location.
    pub fn initialize(&mut self) -> Result<Route, NavigationError> {
        let location = self.provider.location();
        let route = match self.provider.state() {
            Some(state) => match serde_json::from_value::<Route>(state) {
                Ok(route) => route,
                Err(error) => {
                    tracing::warn!(%location, %error, "Discarding unreadable history state");
                    self.decode(&location)
                }
            },
            None => self.decode(&location),
        };

        let state = serde_json::to_value(&route).map_err(NavigationError::Serialize)?;
        let url = self.url_for(&route);
        self.provider.replace_state(state, &url)?;

        if self.listener.is_none() {
            self.listener = Some(self.provider.add_listener());
        }
        self.stack.clear();
        self.stack.push_back(route.clone());
        metrics::set_history_depth(self.stack.len());

        tracing::debug!(resource = route.resource(), %url, "History initialized");
        Ok(route)
    }

    /// Stop receiving native events.
    pub fn teardown(&mut self) {
        if let Some((id, _)) = self.listener.take() {
            self.provider.remove_listener(id);
            tracing::debug!("History listener removed");
        }
    }

    pub fn push(&mut self, route: Route) -> Result<(), NavigationError> {
        let state = serde_json::to_value(&route).map_err(NavigationError::Serialize)?;
        let url = self.url_for(&route);
        self.provider.push_state(state, &url)?;

        self.stack.push_back(route);
        while self.stack.len() > self.max_entries {
            self.stack.pop_front();
        }
        metrics::set_history_depth(self.stack.len());
        tracing::debug!(%url, depth = self.stack.len(), "Route pushed");
        Ok(())
    }

    pub fn replace(&mut self, route: Route) -> Result<(), NavigationError> {
        let state = serde_json::to_value(&route).map_err(NavigationError::Serialize)?;
        let url = self.url_for(&route);
        self.provider.replace_state(state, &url)?;

        match self.stack.back_mut() {
            Some(top) => *top = route,
            None => self.stack.push_back(route),
        }
        metrics::set_history_depth(self.stack.len());
        tracing::debug!(%url, "Route replaced");
        Ok(())
    }

    /// Drop the top entry and ask the native history to go back.
    ///
    /// The new active route arrives with the following `popstate`. The last
    /// remaining entry is never removed.
    pub fn pop(&mut self) -> Option<Route> {
        self.provider.back();
        if self.stack.len() > 1 {
            let popped = self.stack.pop_back();
            metrics::set_history_depth(self.stack.len());
            popped
        } else {
            None
        }
    }

    /// Drain pending native events.
    pub fn pump(&mut self) -> Result<Vec<HistoryChange>, NavigationError> {
        let mut events = Vec::new();
        if let Some((_, rx)) = self.listener.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        let mut changes = Vec::new();
        for event in events {
            let change = match event {
                HistoryEvent::PopState { state, location } => self.on_popstate(state, &location)?,
                HistoryEvent::HashChange { new_location, .. } => self.on_hashchange(&new_location)?,
            };
            changes.extend(change);
        }
        Ok(changes)
    }

    fn on_popstate(
        &mut self,
        state: Option<serde_json::Value>,
        location: &Url,
    ) -> Result<Option<HistoryChange>, NavigationError> {
        let route = match state {
            Some(state) => {
                serde_json::from_value::<Route>(state).map_err(|error| {
                    tracing::error!(%location, %error, "History state is not a route");
                    NavigationError::CorruptState(error)
                })?
            }
            None if self.is_same_document(location) => return self.on_hashchange(location),
            None => self.decode(location),
        };

        match self.stack.back_mut() {
            Some(top) => *top = route.clone(),
            None => self.stack.push_back(route.clone()),
        }
        tracing::debug!(resource = route.resource(), %location, "Popstate");
        Ok(Some(HistoryChange::Replaced(route)))
    }

    fn on_hashchange(&mut self, location: &Url) -> Result<Option<HistoryChange>, NavigationError> {
        let Some(Route::Repo(RepoRoute::Source(source))) = self.stack.back() else {
            return Ok(None);
        };

        let mut updated = source.clone();
        if !apply_fragment(&mut updated, location.fragment()) {
            return Ok(None);
        }

        let route = Route::Repo(RepoRoute::Source(updated));
        let state = serde_json::to_value(&route).map_err(NavigationError::Serialize)?;
        self.provider.replace_state(state, location.as_str())?;
        if let Some(top) = self.stack.back_mut() {
            *top = route.clone();
        }
        tracing::debug!(fragment = location.fragment(), "Hash updated");
        Ok(Some(HistoryChange::HashUpdated(route)))
    }

    /// Whether `location` differs from the active route only by its fragment.
    fn is_same_document(&self, location: &Url) -> bool {
        let Some(active) = self.stack.back() else {
            return false;
        };
        let Some(path) = route_to_path(active, &self.nodes) else {
            return false;
        };
        match location.join(&path) {
            Ok(active_url) => {
                active_url[..Position::AfterQuery] == location[..Position::AfterQuery]
            }
            Err(_) => false,
        }
    }

    fn decode(&self, location: &Url) -> Route {
        resolve_location(location.as_str(), &RouteContext::new(&self.nodes))
    }

    /// Visible URL of a route. Routes without one keep the current location.
    fn url_for(&self, route: &Route) -> String {
        route_to_path(route, &self.nodes)
            .unwrap_or_else(|| self.provider.location()[Position::BeforePath..].to_string())
    }

    pub fn active(&self) -> Option<&Route> {
        self.stack.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Route> {
        self.stack.iter()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn nodes(&self) -> &NodesConfig {
        &self.nodes
    }
}

impl<P: HistoryProvider> Drop for NavigationHistory<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Set `line`/`hash` from a fragment. Returns whether anything changed.
fn apply_fragment(route: &mut SourceRoute, fragment: Option<&str>) -> bool {
    let (line, hash) = parse_fragment(fragment);
    if route.line == line && route.hash == hash {
        return false;
    }
    route.line = line;
    route.hash = hash;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;
    use crate::history::memory::MemoryHistory;
    use crate::routing::{BaseUrl, Scheme};
    use serde_json::json;

    fn config() -> RouterConfig {
        let mut config = RouterConfig::default();
        config.nodes.default_httpd_port = 8080;
        config.nodes.default_httpd_scheme = Scheme::Http;
        config
    }

    fn node() -> BaseUrl {
        BaseUrl {
            hostname: "seed.example.org".into(),
            port: 8080,
            scheme: Scheme::Http,
        }
    }

    fn source(path: &str) -> Route {
        let mut route = SourceRoute::new(node(), "rid");
        route.path = Some(path.to_string());
        Route::Repo(RepoRoute::Source(route))
    }

    fn history() -> NavigationHistory<MemoryHistory> {
        let provider = MemoryHistory::new("http://localhost/").unwrap();
        let mut history = NavigationHistory::new(provider, &config());
        history.initialize().unwrap();
        history
    }

    #[test]
    fn test_initialize_decodes_location() {
        let provider =
            MemoryHistory::new("http://localhost/seeds/seed.example.org/rid/issues").unwrap();
        let mut history = NavigationHistory::new(provider, &config());
        let route = history.initialize().unwrap();

        assert_eq!(route.resource(), "repo.issues");
        assert!(history.is_listening());
        assert!(history.provider().state().is_some());
    }

    #[test]
    fn test_initialize_prefers_stored_state() {
        let mut provider = MemoryHistory::new("http://localhost/").unwrap();
        let stored = source("/docs/a.md");
        provider
            .replace_state(serde_json::to_value(&stored).unwrap(), "/whatever")
            .unwrap();

        let mut history = NavigationHistory::new(provider, &config());
        assert_eq!(history.initialize().unwrap(), stored);
        assert_eq!(
            history.provider().location().path(),
            "/seeds/seed.example.org/rid/tree/docs/a.md"
        );
    }

    #[test]
    fn test_initialize_ignores_unreadable_state() {
        let mut provider = MemoryHistory::new("http://localhost/").unwrap();
        provider.replace_state(json!({"legacy": true}), "/").unwrap();
        let mut history = NavigationHistory::new(provider, &config());
        assert_eq!(history.initialize().unwrap(), Route::Home);
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut history = history();
        history.push(source("/a.md")).unwrap();
        let before = history.len();

        history.replace(source("/b.md")).unwrap();
        history.replace(source("/b.md")).unwrap();

        assert_eq!(history.len(), before);
        assert_eq!(history.active(), Some(&source("/b.md")));
    }

    #[test]
    fn test_stack_is_bounded() {
        let mut history = history();
        for i in 0..15 {
            history.push(source(&format!("/file{i}.md"))).unwrap();
        }

        let paths: Vec<_> = history.entries().cloned().collect();
        let expected: Vec<_> = (5..15).map(|i| source(&format!("/file{i}.md"))).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_custom_bound() {
        let mut config = config();
        config.history = HistoryConfig { max_entries: 2 };
        let provider = MemoryHistory::new("http://localhost/").unwrap();
        let mut history = NavigationHistory::new(provider, &config);
        history.initialize().unwrap();
        for i in 0..4 {
            history.push(source(&format!("/{i}"))).unwrap();
        }
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_failed_write_leaves_stack() {
        let mut history = history();
        history.provider_mut().reject_writes(true);

        assert!(history.push(source("/a.md")).is_err());
        assert!(history.replace(source("/a.md")).is_err());
        assert_eq!(history.len(), 1);
        assert_eq!(history.active(), Some(&Route::Home));
    }

    #[test]
    fn test_pop_then_popstate() {
        let mut history = history();
        history.push(source("/a.md")).unwrap();
        history.push(source("/b.md")).unwrap();

        assert_eq!(history.pop(), Some(source("/b.md")));
        let changes = history.pump().unwrap();
        assert_eq!(changes, vec![HistoryChange::Replaced(source("/a.md"))]);
        assert_eq!(history.active(), Some(&source("/a.md")));
    }

    #[test]
    fn test_pop_keeps_last_entry() {
        let mut history = history();
        assert_eq!(history.pop(), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_hash_only_navigation() {
        let mut history = history();
        history.push(source("/a.md")).unwrap();
        let depth = history.len();

        history.provider_mut().navigate_hash("#L42");
        let changes = history.pump().unwrap();

        let mut expected = SourceRoute::new(node(), "rid");
        expected.path = Some("/a.md".into());
        expected.line = Some(42);
        let expected = Route::Repo(RepoRoute::Source(expected));

        assert_eq!(changes, vec![HistoryChange::HashUpdated(expected.clone())]);
        assert_eq!(history.active(), Some(&expected));
        assert_eq!(history.len(), depth);
    }

    #[test]
    fn test_hashchange_on_other_route_is_ignored() {
        let mut history = history();
        let location = Url::parse("http://localhost/#top").unwrap();
        assert_eq!(history.on_hashchange(&location).unwrap(), None);
    }

    #[test]
    fn test_corrupt_popstate_state() {
        let mut history = history();
        let location = history.provider().location();
        let result = history.on_popstate(Some(json!({"resource": "bogus"})), &location);
        assert!(matches!(result, Err(NavigationError::CorruptState(_))));
    }

    #[test]
    fn test_null_popstate_decodes_location() {
        let mut history = history();
        history.push(source("/a.md")).unwrap();
        let location = Url::parse("http://localhost/seeds/seed.example.org/rid/issues").unwrap();
        let change = history.on_popstate(None, &location).unwrap();
        assert!(matches!(
            change,
            Some(HistoryChange::Replaced(Route::Repo(RepoRoute::Issues(_))))
        ));
    }

    #[test]
    fn test_teardown_removes_listener() {
        let mut history = history();
        assert_eq!(history.provider().listener_count(), 1);
        history.teardown();
        assert_eq!(history.provider().listener_count(), 0);
        assert!(history.pump().unwrap().is_empty());
    }
}
