//! Non-recursive directory watcher delivering creation events.
//!
//! A single `notify::RecommendedWatcher` pushes raw events from its own thread
//! into a bounded channel. One dispatcher task drains the channel and invokes
//! the registered [`CreationHandler`] for every creation, one event at a time,
//! in the order the platform delivered them.
//!
//! ```text
//! notify thread --(mpsc)--> dispatcher task --(blocking pool)--> handler
//!                               ^
//!                     RunState (watch channel)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Capacity of the raw event channel between notify and the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors from watcher setup and the watch loop.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot watch {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("File system notification error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Handler '{handler}' failed for {path}: {reason}")]
    HandlerFailed {
        handler: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Handler '{handler}' panicked while handling {path}")]
    HandlerPanicked { handler: String, path: PathBuf },

    #[error("Watch dispatcher terminated abnormally: {0}")]
    DispatcherAborted(String),
}

/// A newly created entry inside the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCreationEvent {
    /// Full path of the created entry.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

impl FileCreationEvent {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
        }
    }

    /// Extracts creation events from a raw notify event.
    ///
    /// Non-creation kinds yield nothing. When the backend does not say whether
    /// the entry is a file or a folder, the filesystem is asked.
    fn from_notify(event: Event) -> Vec<Self> {
        let EventKind::Create(kind) = event.kind else {
            return Vec::new();
        };

        event
            .paths
            .into_iter()
            .map(|path| {
                let is_directory = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    CreateKind::Any | CreateKind::Other => path.is_dir(),
                };
                Self { path, is_directory }
            })
            .collect()
    }
}

/// Receives creation events from the watcher.
///
/// Invocations are serialized: the watcher never calls `on_created` again
/// before the previous call has returned. Returning an error ends the watch
/// loop.
pub trait CreationHandler: Send + Sync + 'static {
    /// Handler name for logging and error reports.
    fn name(&self) -> &str;

    /// Handle one creation event.
    fn on_created(&self, event: &FileCreationEvent) -> Result<(), WatchError>;
}

/// Lifecycle of a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopping,
    Stopped,
}

/// Entry point for starting a directory watch.
pub struct DirectoryWatcher;

impl DirectoryWatcher {
    /// Starts watching `path` (non-recursively) and dispatching creation
    /// events to `handler`.
    ///
    /// Must be called from within a tokio runtime. Fails if `path` does not
    /// exist, is not a directory, cannot be read, or cannot be registered
    /// with the platform notification facility.
    pub fn start<H: CreationHandler>(path: &Path, handler: H) -> Result<Subscription, WatchError> {
        validate_directory(path)?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.blocking_send(res);
        })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let (state_tx, state_rx) = watch::channel(RunState::Running);
        let state = Arc::new(state_tx);

        let dispatcher = tokio::spawn(dispatch(
            event_rx,
            state_rx,
            Arc::clone(&state),
            Arc::new(handler),
        ));

        tracing::info!("[watcher] watching {}", path.display());

        Ok(Subscription {
            path: path.to_path_buf(),
            watcher: Some(watcher),
            state,
            dispatcher: Some(dispatcher),
        })
    }
}

fn validate_directory(path: &Path) -> Result<(), WatchError> {
    let invalid = |reason: String| WatchError::InvalidDirectory {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    std::fs::read_dir(path).map_err(|e| invalid(format!("not readable: {e}")))?;

    Ok(())
}

/// An active watch on one directory.
///
/// Dropping a subscription without calling [`Subscription::stop`] releases
/// the OS watch; the dispatcher then drains and exits on its own.
pub struct Subscription {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    state: Arc<watch::Sender<RunState>>,
    dispatcher: Option<JoinHandle<Result<(), WatchError>>>,
}

impl Subscription {
    /// The watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Requests shutdown: tells the dispatcher to exit and releases the OS
    /// watch. An event being handled at this moment still runs to completion.
    ///
    /// Never blocks. The notify thread may be parked on a full event channel
    /// until the dispatcher exits, so the watcher is dropped on the blocking
    /// pool rather than on the caller's thread.
    pub fn stop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Stopping;
                true
            } else {
                false
            }
        });

        if let Some(watcher) = self.watcher.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn_blocking(move || drop(watcher));
                }
                Err(_) => drop(watcher),
            }
        }
    }

    /// Resolves once the dispatcher has exited, whether after [`stop`] or on
    /// its own because of a fatal error.
    ///
    /// [`stop`]: Subscription::stop
    pub async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == RunState::Stopped).await;
    }

    /// Waits for the dispatcher to terminate and returns how it ended.
    ///
    /// Calling `wait` a second time returns `Ok(())`.
    pub async fn wait(&mut self) -> Result<(), WatchError> {
        let Some(dispatcher) = self.dispatcher.take() else {
            return Ok(());
        };

        dispatcher
            .await
            .unwrap_or_else(|e| Err(WatchError::DispatcherAborted(e.to_string())))
    }
}

/// Dispatcher loop. Publishes `Stopped` however it exits.
async fn dispatch<H: CreationHandler>(
    mut events: mpsc::Receiver<notify::Result<Event>>,
    mut state_rx: watch::Receiver<RunState>,
    state: Arc<watch::Sender<RunState>>,
    handler: Arc<H>,
) -> Result<(), WatchError> {
    let result = loop {
        tokio::select! {
            biased;

            changed = state_rx.changed() => {
                if changed.is_err() || *state_rx.borrow() != RunState::Running {
                    break Ok(());
                }
            }

            received = events.recv() => match received {
                Some(Ok(event)) => {
                    if let Err(e) = deliver(event, &handler).await {
                        break Err(e);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("[watcher] notification source failed: {e}");
                    break Err(WatchError::Notify(e));
                }
                None => break Ok(()),
            },
        }
    };

    state.send_replace(RunState::Stopped);
    tracing::debug!("[watcher] dispatcher stopped");
    result
}

async fn deliver<H: CreationHandler>(event: Event, handler: &Arc<H>) -> Result<(), WatchError> {
    for created in FileCreationEvent::from_notify(event) {
        tracing::debug!(
            "[watcher] created {} (directory: {})",
            created.path.display(),
            created.is_directory
        );

        let path = created.path.clone();
        let task_handler = Arc::clone(handler);
        tokio::task::spawn_blocking(move || task_handler.on_created(&created))
            .await
            .map_err(|_| WatchError::HandlerPanicked {
                handler: handler.name().to_string(),
                path,
            })??;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::ModifyKind;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<FileCreationEvent>>,
    }

    impl CreationHandler for Arc<Recorder> {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_created(&self, event: &FileCreationEvent) -> Result<(), WatchError> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl CreationHandler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_created(&self, event: &FileCreationEvent) -> Result<(), WatchError> {
            Err(WatchError::HandlerFailed {
                handler: self.name().to_string(),
                path: event.path.clone(),
                reason: "boom".to_string(),
            })
        }
    }

    #[test]
    fn test_from_notify_creation_kinds() {
        let file = Event::new(EventKind::Create(CreateKind::File)).add_path("/w/a.txt".into());
        let folder = Event::new(EventKind::Create(CreateKind::Folder)).add_path("/w/sub".into());

        assert_eq!(
            FileCreationEvent::from_notify(file),
            vec![FileCreationEvent::file("/w/a.txt")]
        );
        assert_eq!(
            FileCreationEvent::from_notify(folder),
            vec![FileCreationEvent::directory("/w/sub")]
        );
    }

    #[test]
    fn test_from_notify_ignores_other_kinds() {
        let modify =
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/w/a.txt".into());
        let remove = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path("/w/a.txt".into());

        assert!(FileCreationEvent::from_notify(modify).is_empty());
        assert!(FileCreationEvent::from_notify(remove).is_empty());
    }

    #[test]
    fn test_from_notify_any_kind_asks_filesystem() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sub = temp_dir.path().join("sub");
        std::fs::create_dir(&sub).expect("Failed to create subdirectory");

        let event = Event::new(EventKind::Create(CreateKind::Any)).add_path(sub.clone());
        assert_eq!(
            FileCreationEvent::from_notify(event),
            vec![FileCreationEvent::directory(sub)]
        );
    }

    #[tokio::test]
    async fn test_start_rejects_missing_directory() {
        let result = DirectoryWatcher::start(
            Path::new("/non/existent/path"),
            Arc::new(Recorder::default()),
        );
        assert!(matches!(result, Err(WatchError::InvalidDirectory { .. })));
    }

    #[tokio::test]
    async fn test_start_rejects_regular_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        std::fs::write(&file, "x").expect("Failed to write file");

        let result = DirectoryWatcher::start(&file, Arc::new(Recorder::default()));
        assert!(matches!(result, Err(WatchError::InvalidDirectory { .. })));
    }

    #[tokio::test]
    async fn test_delivers_creations_and_stops() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let recorder = Arc::new(Recorder::default());
        let mut subscription = DirectoryWatcher::start(temp_dir.path(), Arc::clone(&recorder))
            .expect("Failed to start watcher");
        assert_eq!(subscription.state(), RunState::Running);

        let file = temp_dir.path().join("new.txt");
        std::fs::write(&file, "hello").expect("Failed to write file");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !recorder
            .seen
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.path.file_name() == file.file_name() && !e.is_directory)
        {
            assert!(tokio::time::Instant::now() < deadline, "no creation event");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        subscription.stop();
        tokio::time::timeout(Duration::from_secs(5), subscription.wait())
            .await
            .expect("dispatcher did not stop")
            .expect("dispatcher failed");
        assert_eq!(subscription.state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn test_handler_error_ends_loop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut subscription =
            DirectoryWatcher::start(temp_dir.path(), Failing).expect("Failed to start watcher");

        std::fs::write(temp_dir.path().join("bad.txt"), "x").expect("Failed to write file");

        tokio::time::timeout(Duration::from_secs(5), subscription.stopped())
            .await
            .expect("dispatcher did not exit on handler error");
        let result = subscription.wait().await;
        assert!(matches!(result, Err(WatchError::HandlerFailed { .. })));
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_prompt() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut subscription = DirectoryWatcher::start(temp_dir.path(), Arc::new(Recorder::default()))
            .expect("Failed to start watcher");

        subscription.stop();
        subscription.stop();
        tokio::time::timeout(Duration::from_secs(2), subscription.wait())
            .await
            .expect("dispatcher did not stop")
            .expect("dispatcher failed");
        assert!(subscription.wait().await.is_ok());
    }

    struct Slow;

    impl CreationHandler for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn on_created(&self, _event: &FileCreationEvent) -> Result<(), WatchError> {
            std::thread::sleep(Duration::from_millis(20));
            Ok(())
        }
    }

    /// A burst larger than the event channel parks the notify thread in
    /// `blocking_send`. Stopping from a single-threaded runtime must still
    /// let the dispatcher run and drain.
    #[test]
    fn test_stop_with_full_event_channel_on_current_thread() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build runtime");

            let result = runtime.block_on(async {
                let temp_dir = TempDir::new().expect("Failed to create temp directory");
                let mut subscription =
                    DirectoryWatcher::start(temp_dir.path(), Slow).expect("Failed to start watcher");

                for i in 0..(EVENT_CHANNEL_CAPACITY * 2) {
                    std::fs::write(temp_dir.path().join(format!("burst_{i}.txt")), "x")
                        .expect("Failed to write file");
                }
                tokio::time::sleep(Duration::from_millis(300)).await;

                subscription.stop();
                assert_eq!(subscription.state(), RunState::Stopping);
                subscription.wait().await
            });

            let _ = done_tx.send(result);
        });

        let result = done_rx
            .recv_timeout(Duration::from_secs(20))
            .expect("stop deadlocked while the event channel was full");
        assert!(result.is_ok());
    }
}
