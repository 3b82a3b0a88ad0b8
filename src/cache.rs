//! Per-URL load memoization.
//!
//! Each URL moves through `Unresolved -> InFlight -> Loaded | Failed`. While a
//! URL is in flight every caller receives a clone of the same shared future,
//! so one URL costs at most one fetch no matter how many rows, batches or
//! renders ask for it. Terminal outcomes stick until [`ImageLoadCache::invalidate`].
//!
//! The cache lives on a single-threaded event loop: state sits in a
//! `RefCell` and is never borrowed across an `.await`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use tracing::debug;

use crate::error::LoadFailure;
use crate::fetch::ImageSource;
use crate::image::LogoImage;
use crate::model::LogoUrl;

pub type LoadResult = Result<LogoImage, LoadFailure>;

/// A pending or settled load. Clones observe the same outcome.
pub type PendingLoad = Shared<LocalBoxFuture<'static, LoadResult>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unresolved,
    InFlight,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
enum Outcome {
    Loaded,
    Failed(LoadFailure),
}

#[derive(Default)]
struct CacheState {
    pending: HashMap<LogoUrl, (u64, PendingLoad)>,
    outcomes: HashMap<LogoUrl, Outcome>,
    images: HashMap<LogoUrl, LogoImage>,
    next_ticket: u64,
}

impl CacheState {
    /// Moves `url` to its terminal state, unless the load was detached by an
    /// invalidation while it ran.
    fn settle(&mut self, url: &LogoUrl, ticket: u64, result: &LoadResult) {
        match self.pending.get(url) {
            Some((current, _)) if *current == ticket => {}
            _ => {
                debug!(url = %url, "ignoring completion of invalidated load");
                return;
            }
        }
        self.pending.remove(url);

        match result {
            Ok(image) => {
                self.images.insert(url.clone(), image.clone());
                self.outcomes.insert(url.clone(), Outcome::Loaded);
                debug!(url = %url, "logo loaded");
            }
            Err(failure) => {
                self.outcomes
                    .insert(url.clone(), Outcome::Failed(failure.clone()));
                debug!(url = %url, error = %failure, "logo failed");
            }
        }
    }

    fn settled(&self, url: &LogoUrl) -> Option<LoadResult> {
        match self.outcomes.get(url)? {
            Outcome::Loaded => self.images.get(url).cloned().map(Ok),
            Outcome::Failed(failure) => Some(Err(failure.clone())),
        }
    }
}

/// Results of a batch resolution, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLogos {
    results: HashMap<LogoUrl, LoadResult>,
}

impl ResolvedLogos {
    /// The loaded image for `url`; `None` for failed or never-requested URLs.
    pub fn get(&self, url: &LogoUrl) -> Option<&LogoImage> {
        self.results.get(url).and_then(|r| r.as_ref().ok())
    }

    pub fn result(&self, url: &LogoUrl) -> Option<&LoadResult> {
        self.results.get(url)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.loaded_count()
    }
}

impl FromIterator<(LogoUrl, LoadResult)> for ResolvedLogos {
    fn from_iter<I: IntoIterator<Item = (LogoUrl, LoadResult)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Process-wide (or session-wide) logo cache. Construct one per session and
/// share it by `Rc`; tests build isolated instances.
pub struct ImageLoadCache<S> {
    source: Rc<S>,
    state: Rc<RefCell<CacheState>>,
}

impl<S: ImageSource + 'static> ImageLoadCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Rc::new(source),
            state: Rc::new(RefCell::new(CacheState::default())),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns a handle to the outcome for `url`, starting a load only if the
    /// URL has neither settled nor is already in flight.
    pub fn resolve(&self, url: &LogoUrl) -> PendingLoad {
        let mut state = self.state.borrow_mut();

        if let Some(result) = state.settled(url) {
            return future::ready(result).boxed_local().shared();
        }

        if let Some((_, pending)) = state.pending.get(url) {
            debug!(url = %url, "attaching to in-flight load");
            return pending.clone();
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let source = Rc::clone(&self.source);
        let shared_state = Rc::clone(&self.state);
        let key = url.clone();
        let pending = async move {
            let result = source.load(&key).await;
            shared_state.borrow_mut().settle(&key, ticket, &result);
            result
        }
        .boxed_local()
        .shared();

        debug!(url = %url, "starting load");
        state.pending.insert(url.clone(), (ticket, pending.clone()));
        pending
    }

    /// Resolves every distinct URL in `urls` concurrently and waits for all
    /// of them to settle.
    pub async fn resolve_all<'a, I>(&self, urls: I) -> ResolvedLogos
    where
        I: IntoIterator<Item = &'a LogoUrl>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<LogoUrl> = urls
            .into_iter()
            .filter(|url| !url.is_empty() && seen.insert(*url))
            .cloned()
            .collect();

        let loads: Vec<PendingLoad> = unique.iter().map(|url| self.resolve(url)).collect();
        let results = future::join_all(loads).await;

        unique.into_iter().zip(results).collect()
    }

    /// Settled outcome for `url` without starting a load.
    pub fn peek(&self, url: &LogoUrl) -> Option<LoadResult> {
        self.state.borrow().settled(url)
    }

    pub fn state(&self, url: &LogoUrl) -> LoadState {
        let state = self.state.borrow();
        if state.pending.contains_key(url) {
            return LoadState::InFlight;
        }
        match state.outcomes.get(url) {
            Some(Outcome::Loaded) => LoadState::Loaded,
            Some(Outcome::Failed(_)) => LoadState::Failed,
            None => LoadState::Unresolved,
        }
    }

    /// Forgets everything about `url` so the next `resolve` fetches again.
    pub fn invalidate(&self, url: &LogoUrl) {
        let mut state = self.state.borrow_mut();
        state.pending.remove(url);
        state.outcomes.remove(url);
        state.images.remove(url);
        debug!(url = %url, "invalidated");
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.pending.clear();
        state.outcomes.clear();
        state.images.clear();
    }

    /// Number of URLs that are in flight or settled.
    pub fn len(&self) -> usize {
        let state = self.state.borrow();
        state.pending.len() + state.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
