use super::observer::{self, Observers, SharedObservers};
use super::state::LiveState;
use super::ObserverHandle;
use quarry_core::errors::Result;
use quarry_core::{QuerySpec, Record};
use quarry_core_types::TableId;
use quarry_store::{ChangeNotifier, Repository, TableChanged};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

struct Shared<T> {
    table: TableId,
    state: watch::Sender<LiveState<T>>,
    /// Guards the state against late publishes
    closed: Mutex<bool>,
    /// Lock-free mirror of `closed` for observer delivery
    closing: AtomicBool,
    observers: SharedObservers<T>,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    /// Publish a fetch result; false once the query is closed
    fn publish(&self, state: LiveState<T>) -> bool {
        {
            let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
            if *closed {
                tracing::trace!(table = %self.table, "discarding result for closed live query");
                return false;
            }
            self.state.send_replace(state.clone());
        }
        self.deliver(&state);
        true
    }

    fn close(&self) -> bool {
        {
            let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
            if *closed {
                return false;
            }
            *closed = true;
            self.closing.store(true, Ordering::SeqCst);
            self.state.send_replace(LiveState::Closed);
        }
        observer::deliver(&self.observers, &LiveState::Closed);
        tracing::debug!(table = %self.table, "live query closed");
        true
    }

    fn deliver(&self, state: &LiveState<T>) {
        if !self.closing.load(Ordering::SeqCst) {
            observer::deliver(&self.observers, state);
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Where live queries run their fetch loop and publish results
#[derive(Debug, Clone)]
pub struct LiveScope {
    handle: Handle,
}

impl LiveScope {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scope of the runtime the caller is running on
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Live list of the records matched by `spec`
    pub fn list<R>(&self, repo: &Repository<R>, spec: QuerySpec) -> LiveQuery<Vec<R>>
    where
        R: Record + Clone + Sync,
    {
        let fetcher = repo.clone();
        self.watch(repo.notifier(), repo.table().clone(), move || {
            let repo = fetcher.clone();
            let spec = spec.clone();
            async move { repo.find_all(&spec).await }
        })
    }

    /// Live lookup of one record by identity
    pub fn record<R>(&self, repo: &Repository<R>, id: R::Id) -> LiveQuery<Option<R>>
    where
        R: Record + Clone + Sync,
    {
        let fetcher = repo.clone();
        self.watch(repo.notifier(), repo.table().clone(), move || {
            let repo = fetcher.clone();
            let id = id.clone();
            async move { repo.find(id).await }
        })
    }

    /// Live first match of `spec`
    pub fn first<R>(&self, repo: &Repository<R>, spec: QuerySpec) -> LiveQuery<Option<R>>
    where
        R: Record + Clone + Sync,
    {
        let fetcher = repo.clone();
        self.watch(repo.notifier(), repo.table().clone(), move || {
            let repo = fetcher.clone();
            let spec = spec.clone();
            async move { repo.find_first(&spec).await }
        })
    }

    pub fn count<R: Record>(&self, repo: &Repository<R>, spec: QuerySpec) -> LiveQuery<u64> {
        let fetcher = repo.clone();
        self.watch(repo.notifier(), repo.table().clone(), move || {
            let repo = fetcher.clone();
            let spec = spec.clone();
            async move { repo.count(&spec).await }
        })
    }

    pub fn exists<R: Record>(&self, repo: &Repository<R>, spec: QuerySpec) -> LiveQuery<bool> {
        let fetcher = repo.clone();
        self.watch(repo.notifier(), repo.table().clone(), move || {
            let repo = fetcher.clone();
            let spec = spec.clone();
            async move { repo.exists(&spec).await }
        })
    }

    /// Live result of an arbitrary fetch over `table`
    ///
    /// Registers with `notifier` before this call returns, then loads and
    /// re-fetches on the scope's runtime.
    pub fn watch<T, F, Fut>(
        &self,
        notifier: &ChangeNotifier,
        table: TableId,
        fetch: F,
    ) -> LiveQuery<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let signals = notifier.publisher(&table);
        let (state, _) = watch::channel(LiveState::Pending);
        let shared = Arc::new(Shared {
            table: table.clone(),
            state,
            closed: Mutex::new(false),
            closing: AtomicBool::new(false),
            observers: Arc::new(Mutex::new(Observers::new())),
        });

        let task = self.handle.spawn(drive(shared.clone(), signals, fetch));
        tracing::debug!(table = %table, "live query started");
        LiveQuery { shared, task }
    }
}

/// Initial load, then one re-fetch per burst of change signals
async fn drive<T, F, Fut>(
    shared: Arc<Shared<T>>,
    mut signals: broadcast::Receiver<TableChanged>,
    fetch: F,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !shared.publish(fetch().await.into()) {
        return;
    }

    loop {
        match signals.recv().await {
            Ok(TableChanged) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }

        // Anything already queued is covered by the fetch below
        let mut notifier_closed = false;
        loop {
            match signals.try_recv() {
                Ok(TableChanged) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    notifier_closed = true;
                    break;
                }
            }
        }
        if notifier_closed {
            break;
        }

        tracing::trace!(table = %shared.table, "re-fetching live query");
        if !shared.publish(fetch().await.into()) {
            return;
        }
    }

    shared.close();
}

/// Observable result of one query, kept current as its table changes
///
/// Closing (or dropping) the query stops the fetch loop and releases its
/// notifier registration. Results that arrive afterwards are discarded.
pub struct LiveQuery<T> {
    shared: Arc<Shared<T>>,
    task: JoinHandle<()>,
}

impl<R: Record + Clone + Sync> LiveQuery<Vec<R>> {
    /// [`LiveScope::list`] on the current runtime
    pub fn list(repo: &Repository<R>, spec: QuerySpec) -> Self {
        LiveScope::current().list(repo, spec)
    }
}

impl<R: Record + Clone + Sync> LiveQuery<Option<R>> {
    /// [`LiveScope::record`] on the current runtime
    pub fn record(repo: &Repository<R>, id: R::Id) -> Self {
        LiveScope::current().record(repo, id)
    }

    /// [`LiveScope::first`] on the current runtime
    pub fn first(repo: &Repository<R>, spec: QuerySpec) -> Self {
        LiveScope::current().first(repo, spec)
    }
}

impl LiveQuery<u64> {
    /// [`LiveScope::count`] on the current runtime
    pub fn count<R: Record>(repo: &Repository<R>, spec: QuerySpec) -> Self {
        LiveScope::current().count(repo, spec)
    }
}

impl LiveQuery<bool> {
    /// [`LiveScope::exists`] on the current runtime
    pub fn exists<R: Record>(repo: &Repository<R>, spec: QuerySpec) -> Self {
        LiveScope::current().exists(repo, spec)
    }
}

impl<T: Clone + Send + Sync + 'static> LiveQuery<T> {
    pub fn table(&self) -> &TableId {
        &self.shared.table
    }

    /// Snapshot of the latest state
    pub fn current(&self) -> LiveState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver that wakes on every published state
    pub fn changes(&self) -> watch::Receiver<LiveState<T>> {
        self.shared.state.subscribe()
    }

    /// Call `callback` with every state published from now on
    ///
    /// Callbacks run on the query's task. Use [`LiveQuery::current`] for the
    /// state at registration time.
    pub fn observe<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(&LiveState<T>) + Send + Sync + 'static,
    {
        observer::register(&self.shared.observers, Arc::new(callback))
    }

    pub fn observer_count(&self) -> usize {
        observer::count(&self.shared.observers)
    }

    /// Wait for the first loaded result
    ///
    /// Returns immediately if a result is already available, and `None` if
    /// the query closes before one arrives.
    pub async fn first_result(&self) -> Option<Result<T>> {
        let mut changes = self.shared.state.subscribe();
        let state = changes.wait_for(|state| !state.is_pending()).await.ok()?;
        state.to_result()
    }

    /// Wait until a published state satisfies `predicate`
    ///
    /// Returns `None` if the query closes first.
    pub async fn wait_until<P>(&self, predicate: P) -> Option<Result<T>>
    where
        P: Fn(&LiveState<T>) -> bool,
    {
        let mut changes = self.shared.state.subscribe();
        let state = changes
            .wait_for(|state| state.is_closed() || predicate(state))
            .await
            .ok()?;
        state.to_result()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop re-fetching and release the notifier registration
    ///
    /// Safe at any point, including before the initial load finishes.
    pub fn close(&self) {
        self.shared.close();
        self.task.abort();
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
        let mut closed = self
            .shared
            .closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !*closed {
            *closed = true;
            self.shared.closing.store(true, Ordering::SeqCst);
            self.shared.state.send_replace(LiveState::Closed);
        }
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("table", &self.shared.table)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
