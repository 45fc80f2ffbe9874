//! Stage lifecycle: one dedicated thread per stage.
//!
//! A [`Stage`] owns the `run` procedure of one pipeline role until
//! [`Stage::start`] moves it onto a named thread. The state machine is
//! `NotStarted → Running → Completed` and never goes backwards; a stage whose
//! `run` panics still ends up `Completed`, and the panic is reported by
//! [`Stage::wait`].
//!
//! Role wrappers (producer, consumer, processors) expose the lifecycle through
//! the [`PipelineStage`] trait so differently typed stages can be started and
//! awaited together.

use crate::error::{PipelineError, Result};
use crate::pipeline::id::StageId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Execution state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum StageState {
    NotStarted = 0,
    Running = 1,
    Completed = 2,
}

impl StageState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StageState::NotStarted,
            1 => StageState::Running,
            _ => StageState::Completed,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::NotStarted => write!(f, "not started"),
            StageState::Running => write!(f, "running"),
            StageState::Completed => write!(f, "completed"),
        }
    }
}

/// Which loop a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageRole {
    Producer,
    Consumer,
    Processor,
    Join,
    /// A hand-written `run` closure.
    Custom,
}

#[derive(Debug, Default)]
struct StageCounters {
    received: AtomicU64,
    emitted: AtomicU64,
    released: AtomicU64,
}

/// Handed to the `run` procedure on the stage thread.
#[derive(Debug, Clone)]
pub struct StageContext {
    id: StageId,
    name: Arc<str>,
    counters: Arc<StageCounters>,
}

impl StageContext {
    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count payloads taken from an input queue.
    pub fn record_received(&self, count: u64) {
        self.counters.received.fetch_add(count, Ordering::Relaxed);
    }

    /// Count one payload written to the output queue.
    pub fn record_emitted(&self) {
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count payloads dropped without being forwarded.
    pub fn record_released(&self, count: u64) {
        self.counters.released.fetch_add(count, Ordering::Relaxed);
    }
}

/// Snapshot of one stage, suitable for logging or serialising.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub id: StageId,
    pub name: String,
    pub role: StageRole,
    pub state: StageState,
    /// Payloads taken from input queues
    pub received: u64,
    /// Payloads written to the output queue
    pub emitted: u64,
    /// Payloads dropped without forwarding (shutdown releases, drains, rejected writes)
    pub released: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Panic message if `run` did not return normally
    pub panic: Option<String>,
}

impl StageReport {
    pub fn is_completed(&self) -> bool {
        self.state == StageState::Completed
    }

    /// Wall-clock run time, once the stage has been waited on.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

type StageTask = Box<dyn FnOnce(&StageContext) + Send + 'static>;

/// What the stage thread executes; returns the finish time.
type StageBody = Box<dyn FnOnce() -> DateTime<Utc> + Send + 'static>;

/// Sets the state to `Completed` when the stage thread leaves `run`, panics included.
struct CompletionGuard(Arc<AtomicU8>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.store(StageState::Completed as u8, Ordering::Release);
    }
}

/// A unit of concurrent execution with exactly one `run` procedure.
pub struct Stage {
    id: StageId,
    name: Arc<str>,
    role: StageRole,
    state: Arc<AtomicU8>,
    counters: Arc<StageCounters>,
    /// Taken by the stage thread, so a failed spawn leaves it in place.
    task: Arc<Mutex<Option<StageTask>>>,
    handle: Option<JoinHandle<DateTime<Utc>>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    panic: Option<String>,
}

impl Stage {
    /// Create a stage around its `run` procedure. Nothing runs until [`start`](Self::start).
    pub fn new<F>(name: impl Into<String>, role: StageRole, run: F) -> Self
    where
        F: FnOnce(&StageContext) + Send + 'static,
    {
        let name: String = name.into();
        let task: StageTask = Box::new(run);
        Self {
            id: StageId::next(),
            name: Arc::from(name),
            role,
            state: Arc::new(AtomicU8::new(StageState::NotStarted as u8)),
            counters: Arc::new(StageCounters::default()),
            task: Arc::new(Mutex::new(Some(task))),
            handle: None,
            started_at: None,
            finished_at: None,
            panic: None,
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> StageRole {
        self.role
    }

    pub fn state(&self) -> StageState {
        StageState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_completed(&self) -> bool {
        self.state() == StageState::Completed
    }

    /// Schedule `run` on its own thread. Does not block.
    ///
    /// If the thread cannot be spawned the stage stays `NotStarted` and keeps
    /// its `run` procedure, so `start` may be retried.
    pub fn start(&mut self) -> Result<()> {
        self.launch(|builder, body| builder.spawn(body))
    }

    fn launch<F>(&mut self, spawn: F) -> Result<()>
    where
        F: FnOnce(thread::Builder, StageBody) -> io::Result<JoinHandle<DateTime<Utc>>>,
    {
        if self.started_at.is_some() || !self.has_task() {
            return Err(PipelineError::AlreadyStarted(self.name.to_string()));
        }

        let ctx = StageContext {
            id: self.id,
            name: Arc::clone(&self.name),
            counters: Arc::clone(&self.counters),
        };
        let state = Arc::clone(&self.state);
        let slot = Arc::clone(&self.task);
        self.state
            .store(StageState::Running as u8, Ordering::Release);

        let body: StageBody = Box::new(move || {
            let _guard = CompletionGuard(state);
            let task = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            tracing::debug!(stage = %ctx.name, id = %ctx.id, "Stage running");
            if let Some(task) = task {
                task(&ctx);
            }
            tracing::debug!(
                stage = %ctx.name,
                received = ctx.counters.received.load(Ordering::Relaxed),
                emitted = ctx.counters.emitted.load(Ordering::Relaxed),
                released = ctx.counters.released.load(Ordering::Relaxed),
                "Stage finished"
            );
            Utc::now()
        });

        match spawn(thread::Builder::new().name(self.name.to_string()), body) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.started_at = Some(Utc::now());
                Ok(())
            }
            Err(source) => {
                tracing::warn!(stage = %self.name, %source, "Stage thread not spawned");
                self.state
                    .store(StageState::NotStarted as u8, Ordering::Release);
                Err(PipelineError::Spawn {
                    name: self.name.to_string(),
                    source,
                })
            }
        }
    }

    fn has_task(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Block until `run` has returned.
    ///
    /// Calling it again after completion is a no-op that repeats the outcome.
    pub fn wait(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(finished_at) => self.finished_at = Some(finished_at),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(stage = %self.name, %message, "Stage panicked");
                    self.finished_at = Some(Utc::now());
                    self.panic = Some(message);
                }
            }
        } else if self.started_at.is_none() {
            return Err(PipelineError::NotStarted(self.name.to_string()));
        }

        match &self.panic {
            Some(message) => Err(PipelineError::StagePanicked {
                name: self.name.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn report(&self) -> StageReport {
        StageReport {
            id: self.id,
            name: self.name.to_string(),
            role: self.role,
            state: self.state(),
            received: self.counters.received.load(Ordering::Relaxed),
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            started_at: self.started_at,
            finished_at: self.finished_at,
            panic: self.panic.clone(),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Common lifecycle surface of every stage wrapper.
pub trait PipelineStage: Send {
    fn stage(&self) -> &Stage;

    fn stage_mut(&mut self) -> &mut Stage;

    fn start(&mut self) -> Result<()> {
        self.stage_mut().start()
    }

    fn wait(&mut self) -> Result<()> {
        self.stage_mut().wait()
    }

    fn report(&self) -> StageReport {
        self.stage().report()
    }
}

impl PipelineStage for Stage {
    fn stage(&self) -> &Stage {
        self
    }

    fn stage_mut(&mut self) -> &mut Stage {
        self
    }
}

/// Start every stage in order, stopping at the first failure.
pub fn start_all<'a, S, I>(stages: I) -> Result<()>
where
    I: IntoIterator<Item = &'a mut S>,
    S: PipelineStage + ?Sized + 'a,
{
    for stage in stages {
        stage.start()?;
    }
    Ok(())
}

/// Wait for every stage, even after a failure, and return the first error.
pub fn wait_all<'a, S, I>(stages: I) -> Result<()>
where
    I: IntoIterator<Item = &'a mut S>,
    S: PipelineStage + ?Sized + 'a,
{
    let mut first_error = None;
    for stage in stages {
        if let Err(err) = stage.wait() {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}
