//! Navigation controller.
//!
//! # Responsibilities
//! - Resolve a route through the [`RouteLoader`], then record it in history
//! - Publish the active loaded route and the loading flag over `watch` channels
//! - Discard results of loads that were overtaken by a newer navigation
//!
//! # Design Decisions
//! - History is written only after the load finished, so the visible URL and the
//!   displayed data change together
//! - The sequence check and the publish happen under the history lock; two
//!   completions can never interleave their writes
//! - The lock is never held across an `.await`

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use url::Position;

use crate::history::{HistoryChange, HistoryProvider, NavigationError, NavigationHistory};
use crate::loader::{LoadedRoute, RouteLoader};
use crate::navigator::sequence::LoadSequencer;
use crate::observability::metrics;
use crate::routing::{resolve_location, Route, RouteContext};

/// How a navigation is recorded in the native history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Push,
    Replace,
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// The route was loaded and is now active.
    Applied(Arc<LoadedRoute>),
    /// A newer navigation started while this one was loading.
    Superseded,
    /// Nothing to do (same location, or a hash-only change).
    Unchanged,
}

impl NavigationOutcome {
    pub fn loaded(&self) -> Option<&LoadedRoute> {
        match self {
            NavigationOutcome::Applied(loaded) => Some(loaded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Write {
    Push,
    Replace,
    /// The native history already points at the route.
    Synced,
}

impl From<HistoryAction> for Write {
    fn from(action: HistoryAction) -> Self {
        match action {
            HistoryAction::Push => Write::Push,
            HistoryAction::Replace => Write::Replace,
        }
    }
}

pub struct Navigator<P: HistoryProvider, L: RouteLoader> {
    history: Mutex<NavigationHistory<P>>,
    loader: L,
    sequencer: LoadSequencer,
    loading: watch::Sender<bool>,
    active: watch::Sender<Arc<LoadedRoute>>,
}

impl<P: HistoryProvider, L: RouteLoader> Navigator<P, L> {
    pub fn new(history: NavigationHistory<P>, loader: L) -> Self {
        let (loading, _) = watch::channel(false);
        let (active, _) = watch::channel(Arc::new(LoadedRoute::Booting));
        Self {
            history: Mutex::new(history),
            loader,
            sequencer: LoadSequencer::new(),
            loading,
            active,
        }
    }

    fn lock_history(&self) -> MutexGuard<'_, NavigationHistory<P>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach to the native history and load whatever it currently shows.
    pub async fn initialize(&self) -> Result<NavigationOutcome, NavigationError> {
        let route = self.lock_history().initialize()?;
        metrics::record_navigation("initialize");
        self.navigate(route, Write::Synced).await
    }

    pub async fn push(&self, route: Route) -> Result<NavigationOutcome, NavigationError> {
        metrics::record_navigation("push");
        self.navigate(route, Write::Push).await
    }

    pub async fn replace(&self, route: Route) -> Result<NavigationOutcome, NavigationError> {
        metrics::record_navigation("replace");
        self.navigate(route, Write::Replace).await
    }

    /// Follow a link. `href` is resolved against the current location; other
    /// origins are refused and links to the current path and query are ignored.
    pub async fn navigate_to_url(
        &self,
        action: HistoryAction,
        href: &str,
    ) -> Result<NavigationOutcome, NavigationError> {
        let route = {
            let history = self.lock_history();
            let current = history.provider().location();
            let url = current.join(href)?;

            if url.origin() != current.origin() {
                tracing::warn!(%url, "Refusing cross-origin navigation");
                return Err(NavigationError::CrossOrigin(href.to_string()));
            }
            if url[Position::BeforePath..Position::AfterQuery]
                == current[Position::BeforePath..Position::AfterQuery]
            {
                tracing::debug!(%url, "Already at location");
                return Ok(NavigationOutcome::Unchanged);
            }
            resolve_location(url.as_str(), &RouteContext::new(history.nodes()))
        };

        metrics::record_navigation("url");
        self.navigate(route, action.into()).await
    }

    /// Decode the current location and load it in place.
    pub async fn load_from_location(&self) -> Result<NavigationOutcome, NavigationError> {
        let route = {
            let history = self.lock_history();
            let location = history.provider().location();
            resolve_location(location.as_str(), &RouteContext::new(history.nodes()))
        };
        metrics::record_navigation("location");
        self.navigate(route, Write::Replace).await
    }

    /// Go back one entry and load the route the native history lands on.
    pub async fn back(&self) -> Result<NavigationOutcome, NavigationError> {
        self.lock_history().pop();
        metrics::record_navigation("pop");
        self.sync_history().await
    }

    /// Apply pending native history events. Only the last traversal is loaded;
    /// hash-only changes need no load.
    pub async fn sync_history(&self) -> Result<NavigationOutcome, NavigationError> {
        let changes = self.lock_history().pump()?;
        let target = changes
            .into_iter()
            .filter_map(|change| match change {
                HistoryChange::Replaced(route) => Some(route),
                HistoryChange::HashUpdated(_) => None,
            })
            .last();

        match target {
            Some(route) => self.navigate(route, Write::Synced).await,
            None => Ok(NavigationOutcome::Unchanged),
        }
    }

    async fn navigate(
        &self,
        route: Route,
        write: Write,
    ) -> Result<NavigationOutcome, NavigationError> {
        let ticket = self.sequencer.next();
        self.loading.send_replace(true);
        let resource = route.resource();
        tracing::debug!(resource, ticket = ticket.value(), "Navigation started");

        let previous = self.active.borrow().clone();
        let loaded = Arc::new(self.loader.load(&route, &previous).await);

        let mut history = self.lock_history();
        if !self.sequencer.is_current(ticket) {
            metrics::record_stale_load();
            tracing::debug!(resource, ticket = ticket.value(), "Discarding superseded load");
            return Ok(NavigationOutcome::Superseded);
        }

        let written = match write {
            Write::Push => history.push(route),
            Write::Replace => history.replace(route),
            Write::Synced => Ok(()),
        };
        if let Err(e) = written {
            self.loading.send_replace(false);
            return Err(e);
        }

        self.active.send_replace(Arc::clone(&loaded));
        self.loading.send_replace(false);
        drop(history);

        tracing::info!(resource, title = %loaded.document_title(), "Route loaded");
        Ok(NavigationOutcome::Applied(loaded))
    }

    pub fn active(&self) -> Arc<LoadedRoute> {
        self.active.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn document_title(&self) -> String {
        self.active.borrow().document_title()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Arc<LoadedRoute>> {
        self.active.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Inspect the navigation history.
    pub fn with_history<R>(&self, read: impl FnOnce(&NavigationHistory<P>) -> R) -> R {
        read(&self.lock_history())
    }

    /// Access the native history, e.g. to simulate user traversal.
    pub fn with_provider<R>(&self, update: impl FnOnce(&mut P) -> R) -> R {
        update(self.lock_history().provider_mut())
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Stop listening to native history events.
    pub fn teardown(&self) {
        self.lock_history().teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::RouterConfig;
    use crate::history::MemoryHistory;
    use crate::routing::{BaseUrl, IssuesRoute, RepoRoute, Scheme};

    /// Loads instantly, except issue listings which take `slow`.
    struct StubLoader {
        slow: Duration,
    }

    #[async_trait]
    impl RouteLoader for StubLoader {
        async fn load(&self, route: &Route, _previous: &LoadedRoute) -> LoadedRoute {
            if route.resource() == "repo.issues" {
                tokio::time::sleep(self.slow).await;
            }
            match route {
                Route::Home => LoadedRoute::Home {
                    preferred_seeds: Vec::new(),
                },
                other => LoadedRoute::not_found(other.resource()),
            }
        }
    }

    fn issues() -> Route {
        Route::Repo(RepoRoute::Issues(IssuesRoute {
            node: BaseUrl {
                hostname: "seed.example.org".into(),
                port: 8080,
                scheme: Scheme::Http,
            },
            repo: "rid".into(),
            status: None,
        }))
    }

    async fn navigator(slow: Duration) -> Navigator<MemoryHistory, StubLoader> {
        let mut config = RouterConfig::default();
        config.nodes.default_httpd_port = 8080;
        config.nodes.default_httpd_scheme = Scheme::Http;
        let provider = MemoryHistory::new("http://localhost/").unwrap();
        let navigator = Navigator::new(
            NavigationHistory::new(provider, &config),
            StubLoader { slow },
        );
        navigator.initialize().await.unwrap();
        navigator
    }

    fn home() -> LoadedRoute {
        LoadedRoute::Home {
            preferred_seeds: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_initialize_loads_location() {
        let navigator = navigator(Duration::ZERO).await;
        assert_eq!(*navigator.active(), home());
        assert!(!navigator.is_loading());
        assert_eq!(navigator.document_title(), "Radicle");
    }

    #[tokio::test]
    async fn test_push_writes_history_after_load() {
        let navigator = navigator(Duration::ZERO).await;
        let outcome = navigator.push(issues()).await.unwrap();

        assert_eq!(
            outcome.loaded(),
            Some(&LoadedRoute::not_found("repo.issues"))
        );
        navigator.with_history(|history| {
            assert_eq!(history.len(), 2);
            assert_eq!(
                history.provider().location().path(),
                "/seeds/seed.example.org/rid/issues"
            );
        });
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let navigator = navigator(Duration::from_millis(50)).await;
        let mut active = navigator.subscribe_active();

        let (slow, fast) = tokio::join!(navigator.push(issues()), navigator.push(Route::Home));

        assert_eq!(slow.unwrap(), NavigationOutcome::Superseded);
        assert!(matches!(fast.unwrap(), NavigationOutcome::Applied(_)));
        assert_eq!(**active.borrow_and_update(), home());
        navigator.with_history(|history| {
            assert_eq!(history.len(), 2);
            assert_eq!(history.active(), Some(&Route::Home));
        });
    }

    #[tokio::test]
    async fn test_loading_flag_spans_load() {
        let navigator = navigator(Duration::from_millis(50)).await;
        let (result, observed) = tokio::join!(navigator.push(issues()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            navigator.is_loading()
        });
        result.unwrap();
        assert!(observed);
        assert!(!navigator.is_loading());
    }

    #[tokio::test]
    async fn test_navigate_to_url() {
        let navigator = navigator(Duration::ZERO).await;

        let foreign = navigator
            .navigate_to_url(HistoryAction::Push, "https://elsewhere.example/")
            .await;
        assert!(matches!(foreign, Err(NavigationError::CrossOrigin(_))));

        let same = navigator
            .navigate_to_url(HistoryAction::Push, "/#section")
            .await
            .unwrap();
        assert_eq!(same, NavigationOutcome::Unchanged);

        let outcome = navigator
            .navigate_to_url(HistoryAction::Push, "/seeds/seed.example.org/rid/issues")
            .await
            .unwrap();
        assert_eq!(outcome.loaded(), Some(&LoadedRoute::not_found("repo.issues")));
    }

    #[tokio::test]
    async fn test_back_reloads_previous_entry() {
        let navigator = navigator(Duration::ZERO).await;
        navigator.push(issues()).await.unwrap();

        let outcome = navigator.back().await.unwrap();
        assert_eq!(outcome.loaded(), Some(&home()));
        navigator.with_history(|history| {
            assert_eq!(history.active(), Some(&Route::Home));
            assert_eq!(history.provider().location().path(), "/");
        });
    }

    #[tokio::test]
    async fn test_failed_history_write_keeps_active_route() {
        let navigator = navigator(Duration::ZERO).await;
        navigator.with_provider(|provider| provider.reject_writes(true));

        assert!(navigator.push(issues()).await.is_err());
        assert_eq!(*navigator.active(), home());
        assert!(!navigator.is_loading());
    }
}
