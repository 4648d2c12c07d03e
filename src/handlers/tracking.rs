use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::handlers::location_sink::LocationSink;
use crate::handlers::location_source::LocationSource;
use crate::handlers::location_task::{LocationTask, LOCATION_TASK};
use crate::models::error::{QueueError, Result};
use crate::models::options::TrackingOptions;
use crate::storage::KeyValueStore;

pub static TASKS: once_cell::sync::Lazy<Arc<TaskRegistry>> = once_cell::sync::Lazy::new(|| Arc::new(TaskRegistry::default()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request_foreground(&self) -> PermissionStatus;
    async fn request_background(&self) -> PermissionStatus;
}

/// Fixed answers, for hosts where permission is decided up front.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    pub foreground: PermissionStatus,
    pub background: PermissionStatus,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self { foreground: PermissionStatus::Granted, background: PermissionStatus::Granted }
    }
}

impl FromStr for StaticPermissions {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use PermissionStatus::*;
        let (foreground, background) = match s.to_ascii_lowercase().as_str() {
            "granted" => (Granted, Granted),
            "foreground" | "foreground-only" => (Granted, Denied),
            "denied" => (Denied, Denied),
            other => return Err(format!("unknown permission setting '{}'", other)),
        };
        Ok(Self { foreground, background })
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request_foreground(&self) -> PermissionStatus {
        self.foreground
    }

    async fn request_background(&self) -> PermissionStatus {
        self.background
    }
}

/// Names of background tasks with location updates running.
#[derive(Default)]
pub struct TaskRegistry {
    started: DashMap<String, TrackingOptions>,
}

impl TaskRegistry {
    pub fn has_started(&self, task_name: &str) -> bool {
        self.started.contains_key(task_name)
    }

    pub fn options(&self, task_name: &str) -> Option<TrackingOptions> {
        self.started.get(task_name).map(|o| o.value().clone())
    }

    /// Returns false when the name is already taken.
    fn register(&self, task_name: &str, options: TrackingOptions) -> bool {
        match self.started.entry(task_name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(options);
                true
            }
        }
    }

    fn unregister(&self, task_name: &str) {
        self.started.remove(task_name);
    }
}

struct AutoCancelTask<T>(pub JoinHandle<T>);

impl<T> Drop for AutoCancelTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A running registration. Dropping it unregisters the listener and aborts
/// both the source and the location task; queued points stay in storage.
pub struct TrackingHandle {
    task_name: String,
    registry: Arc<TaskRegistry>,
    source: AutoCancelTask<()>,
    task: Option<AutoCancelTask<Result<()>>>,
}

impl TrackingHandle {
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Unregisters the task and aborts the source and the location task.
    pub fn stop(self) {
        info!(task = %self.task_name, "stopping location updates");
        self.registry.unregister(&self.task_name);
        self.source.0.abort();
        if let Some(task) = &self.task {
            task.0.abort();
        }
    }

    /// Waits for the location task to finish, i.e. for the source to run dry.
    pub async fn wait(mut self) -> Result<()> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        match (&mut task.0).await {
            Ok(result) => result,
            Err(e) => Err(QueueError::Task(e.to_string())),
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.source.0.abort();
        self.registry.unregister(&self.task_name);
    }
}

pub enum StartOutcome {
    Started(TrackingHandle),
    AlreadyStarted,
}

/// Asks for foreground then background permission and, unless the location
/// task is already registered, starts the source feeding a [`LocationTask`].
pub async fn start_background_updates<P, Src, S, K>(
    registry: Arc<TaskRegistry>,
    permissions: &P,
    mut source: Src,
    task: LocationTask<S, K>,
    options: TrackingOptions,
) -> Result<StartOutcome>
where
    P: PermissionProvider + ?Sized,
    Src: LocationSource + 'static,
    S: KeyValueStore + 'static,
    K: LocationSink + 'static,
{
    if permissions.request_foreground().await != PermissionStatus::Granted {
        return Err(QueueError::PermissionDenied("foreground"));
    }
    if permissions.request_background().await != PermissionStatus::Granted {
        return Err(QueueError::PermissionDenied("background"));
    }

    if !registry.register(LOCATION_TASK, options.clone()) {
        warn!(task = LOCATION_TASK, "location updates already started");
        return Ok(StartOutcome::AlreadyStarted);
    }

    info!(
        task = LOCATION_TASK,
        accuracy = %options.accuracy,
        distance_interval = options.distance_interval,
        deferred_ms = options.deferred_updates_interval.as_millis() as u64,
        pauses_automatically = options.pauses_updates_automatically,
        notification = %options.foreground_service.notification_title,
        "starting location updates"
    );

    let (tx, rx) = mpsc::channel(64);
    let task = AutoCancelTask(tokio::spawn(task.run_actor(rx)));
    let source = AutoCancelTask(tokio::spawn(async move {
        source.run(options, tx).await;
    }));

    Ok(StartOutcome::Started(TrackingHandle {
        task_name: LOCATION_TASK.to_string(),
        registry,
        source,
        task: Some(task),
    }))
}
