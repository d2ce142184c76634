//! The serialized access queue.
//!
//! A [`Store`] is a cheap handle to a single worker task that owns the
//! database, the current binding and the open-state machine. Every
//! operation is a command on one channel, so operations run one at a time in
//! the order they were issued and no write can interleave with another.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::identity::{IdentityHandle, Namespace};
use crate::location::Location;
use crate::models::WatermarkRow;
use crate::repo::{CONTENT_WATERMARK, Repository};
use crate::reset::remove_namespace_files;
use exn::{OptionExt, ResultExt};
use feedstash_config::CacheConfig;
use feedstash_models::CacheRequest;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use time::UtcDateTime;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

type ReadJob = Box<dyn FnOnce(Result<Repository>) -> BoxFuture<'static, ()> + Send>;

enum Command {
    Configure(oneshot::Sender<()>),
    Upsert(CacheRequest, oneshot::Sender<Result<CacheRequest>>),
    LastFetchedAt(oneshot::Sender<Option<UtcDateTime>>),
    Delete(u64, oneshot::Sender<()>),
    Read(ReadJob),
    Close(oneshot::Sender<()>),
}

/// Outcome of an operation that has already been queued.
///
/// The operation runs whether or not this is awaited; awaiting only observes
/// the result. Resolves to [`ErrorKind::CacheFailure`] if the store shut down
/// before the operation ran.
#[derive(Debug)]
#[must_use = "the operation is queued either way, but its outcome is lost unless awaited"]
pub struct Pending<T> {
    reply: oneshot::Receiver<Result<T>>,
}
impl<T> Future for Pending<T> {
    type Output = Result<T>;
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.reply)
            .poll(cx)
            .map(|reply| reply.or_raise(|| ErrorKind::CacheFailure).and_then(|result| result))
    }
}

/// Handle to the offline content cache.
#[derive(Debug, Clone)]
pub struct Store {
    commands: mpsc::UnboundedSender<Command>,
}
impl Store {
    /// Start the worker on the current Tokio runtime.
    ///
    /// Nothing is opened until [`configure`](Self::configure) is called. The
    /// worker stops, closing the database, when [`close`](Self::close) is
    /// called or every handle has been dropped.
    pub fn spawn(config: CacheConfig, identity: IdentityHandle) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = Worker { config, identity, binding: None, phase: Phase::Unopened };
        tokio::spawn(worker.run(receiver));
        Self { commands }
    }

    fn send(&self, command: Command) {
        // A closed queue drops the command along with its reply sender, which
        // the waiting side observes.
        if self.commands.send(command).is_err() {
            tracing::debug!("Cache store is closed");
        }
    }

    /// Bind the store to the current identity's database file.
    ///
    /// Does nothing when already bound to that file. A file that cannot be
    /// opened is deleted and recreated once; if that fails too, the failure
    /// is logged and the next write reports it.
    pub async fn configure(&self) {
        let (reply, done) = oneshot::channel();
        self.send(Command::Configure(reply));
        _ = done.await;
    }

    /// Merge everything in `request` into the cache and advance the sync
    /// watermark to `request.last_fetched_at`.
    ///
    /// The write is queued immediately, fixing its order relative to other
    /// operations; the returned [`Pending`] resolves to the untouched request
    /// once it has been committed. Any failure is an
    /// [`ErrorKind::CacheFailure`] and leaves the watermark where it was.
    pub fn create_or_update(&self, request: CacheRequest) -> Pending<CacheRequest> {
        let (reply, pending) = oneshot::channel();
        self.send(Command::Upsert(request, reply));
        Pending { reply: pending }
    }

    /// When content was last fetched and cached successfully.
    ///
    /// `None` when nothing has been cached yet, including when the database
    /// cannot be opened.
    pub async fn last_fetched_at(&self) -> Option<UtcDateTime> {
        let (reply, value) = oneshot::channel();
        self.send(Command::LastFetchedAt(reply));
        value.await.ok().flatten()
    }

    /// Remove every file belonging to `identity`.
    ///
    /// If that identity's database is the open one, it is closed first and
    /// recreated empty on next use.
    pub async fn delete(&self, identity: u64) {
        let (reply, done) = oneshot::channel();
        self.send(Command::Delete(identity, reply));
        _ = done.await;
    }

    /// Run `f` against the open database, in turn with every other operation.
    ///
    /// `f` runs on the worker itself and holds up the queue until it
    /// finishes. It must not await another operation on this store (or any
    /// clone of it): that operation queues behind `f` and never runs.
    pub async fn read<T, F, Fut>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Repository) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (reply, pending) = oneshot::channel();
        let job: ReadJob = Box::new(move |repo: Result<Repository>| {
            async move {
                let result = match repo {
                    Ok(repo) => f(repo).await,
                    Err(err) => Err(err),
                };
                _ = reply.send(result);
            }
            .boxed()
        });
        self.send(Command::Read(job));
        Pending { reply: pending }.await
    }

    /// Close the database and stop the worker.
    ///
    /// Operations queued after this resolve as failures.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        self.send(Command::Close(reply));
        _ = done.await;
    }
}

/// The database file the worker is currently pointed at.
#[derive(Debug)]
struct Binding {
    namespace: Namespace,
    location: Location,
}

#[derive(Debug)]
enum Phase {
    Unopened,
    Ready(Database),
    /// Opening failed even after recovery.
    Failed,
}

/// Steps of the first open after binding.
enum Attempt {
    Opening { retried: bool },
    Recovering,
}

struct Worker {
    config: CacheConfig,
    identity: IdentityHandle,
    binding: Option<Binding>,
    phase: Phase,
}
impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Configure(reply) => {
                    self.configure().await;
                    _ = reply.send(());
                },
                Command::Upsert(request, reply) => {
                    _ = reply.send(self.create_or_update(request).await);
                },
                Command::LastFetchedAt(reply) => {
                    _ = reply.send(self.last_fetched_at().await);
                },
                Command::Delete(identity, reply) => {
                    self.delete(identity).await;
                    _ = reply.send(());
                },
                Command::Read(job) => {
                    let repo = self.ensure_open().await;
                    job(repo).await;
                },
                Command::Close(reply) => {
                    self.close_database().await;
                    _ = reply.send(());
                    return;
                },
            }
        }
        self.close_database().await;
    }

    #[instrument(skip(self))]
    async fn configure(&mut self) {
        let namespace = Namespace::from_identity(self.identity.current());
        let Some(location) = Location::resolve(&self.config, &namespace) else {
            tracing::debug!(%namespace, "No cache location available");
            return;
        };
        if self.binding.as_ref().is_some_and(|bound| bound.location.file == location.file) {
            tracing::debug!(%namespace, "Cache already bound");
            return;
        }
        location.prepare();
        self.close_database().await;
        tracing::info!(%namespace, path = %location.file.display(), "Binding cache database");
        self.binding = Some(Binding { namespace, location });
        self.open_with_recovery().await;
    }

    /// Open the bound file, deleting and recreating it once if it is
    /// unreadable or its schema cannot be migrated.
    async fn open_with_recovery(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        let mut attempt = Attempt::Opening { retried: false };
        loop {
            attempt = match attempt {
                Attempt::Opening { retried } => match Database::open(&binding.location.file, &self.config.compaction).await {
                    Ok(db) => {
                        self.phase = Phase::Ready(db);
                        return;
                    },
                    Err(error) if !retried => {
                        tracing::warn!(namespace = %binding.namespace, ?error, "Could not open cache, recreating it");
                        Attempt::Recovering
                    },
                    Err(error) => {
                        tracing::error!(namespace = %binding.namespace, ?error, "Could not recreate cache");
                        self.phase = Phase::Failed;
                        return;
                    },
                },
                Attempt::Recovering => {
                    remove_namespace_files(&binding.location.folder, &binding.namespace);
                    Attempt::Opening { retried: true }
                },
            };
        }
    }

    /// The open database, opening the bound file first if needed.
    async fn ensure_open(&mut self) -> Result<Repository> {
        if let Phase::Ready(db) = &self.phase {
            return Ok(Repository::from(db));
        }
        let binding = self.binding.as_ref().ok_or_raise(|| ErrorKind::NotConfigured)?;
        let db = Database::open(&binding.location.file, &self.config.compaction).await?;
        let repo = Repository::from(&db);
        self.phase = Phase::Ready(db);
        Ok(repo)
    }

    #[instrument(skip_all, fields(records = request.len()))]
    async fn create_or_update(&mut self, request: CacheRequest) -> Result<CacheRequest> {
        if request.is_empty() {
            tracing::debug!("Nothing to cache");
            return Ok(request);
        }
        // Encoded before anything is written, so that a committed batch is
        // never left without its watermark because of the timestamp itself.
        let watermark =
            WatermarkRow::new(CONTENT_WATERMARK, request.last_fetched_at).or_raise(|| ErrorKind::CacheFailure)?;
        let repo = self.ensure_open().await.or_raise(|| ErrorKind::CacheFailure)?;
        repo.upsert(&request).await.or_raise(|| ErrorKind::CacheFailure)?;
        // The records are committed at this point; a missing watermark only
        // means the next sync fetches more than it needs to.
        if let Err(error) = repo.set_watermark(watermark).await {
            tracing::error!(?error, "Could not record sync watermark");
        }
        Ok(request)
    }

    async fn last_fetched_at(&mut self) -> Option<UtcDateTime> {
        let result = match self.ensure_open().await {
            Ok(repo) => repo.last_fetched_at(CONTENT_WATERMARK).await,
            Err(error) => Err(error),
        };
        result.unwrap_or_else(|error| {
            tracing::warn!(?error, "Could not read sync watermark");
            None
        })
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, identity: u64) {
        let namespace = Namespace::from_identity(identity);
        let Some(location) = Location::resolve(&self.config, &namespace) else {
            tracing::debug!(%namespace, "No cache location available");
            return;
        };
        if self.binding.as_ref().is_some_and(|bound| bound.namespace == namespace) {
            self.close_database().await;
        }
        let removed = remove_namespace_files(&location.folder, &namespace);
        tracing::info!(%namespace, removed, "Reset cache");
    }

    async fn close_database(&mut self) {
        if let Phase::Ready(db) = std::mem::replace(&mut self.phase, Phase::Unopened) {
            db.close().await;
        }
    }
}
