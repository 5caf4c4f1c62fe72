//! Slot-limited task schedulers.
//!
//! A scheduler runs [`Task`]s on the tokio runtime with a fixed number of
//! slots. Every slot owns one [`PchCreator`]; a task borrows the creator of
//! the slot it runs in.

use futures::future::BoxFuture;
use pchqueue_core::{PchCreator, ProgressCounter};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::SchedulerError;

/// An executable PCH job. It receives the creator of the slot it runs in.
pub type Task = Box<
    dyn for<'a> FnOnce(&'a mut dyn PchCreator) -> BoxFuture<'a, pchqueue_core::Result<()>> + Send,
>;

/// Box a closure as a [`Task`].
pub fn task<F>(f: F) -> Task
where
    F: for<'a> FnOnce(&'a mut dyn PchCreator) -> BoxFuture<'a, pchqueue_core::Result<()>>
        + Send
        + 'static,
{
    Box::new(f)
}

/// Snapshot of a scheduler's capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotUsage {
    pub free: usize,
    pub used: usize,
}

/// A pool of worker slots tasks can be handed to.
pub trait TaskScheduler: Send + Sync {
    /// Current capacity. Only valid at the time of the call, but never
    /// reports more free slots than there are.
    fn slot_usage(&self) -> SlotUsage;

    /// Accept tasks for execution. Accepted tasks count as used right away.
    fn add_tasks(&self, tasks: Vec<Task>);
}

/// Scheduler with one creator per slot, running tasks on a tokio runtime.
///
/// Tasks handed over while every slot is busy wait in a backlog and start as
/// soon as a slot frees up. Both running and waiting tasks count as used.
pub struct SlotScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    slots: usize,
    state: Mutex<SlotState>,
    progress: Arc<dyn ProgressCounter>,
    completed: Arc<Notify>,
    runtime: Handle,
}

struct SlotState {
    idle_creators: Vec<Box<dyn PchCreator>>,
    backlog: VecDeque<Task>,
    running: usize,
}

impl SlotScheduler {
    /// Create a scheduler with `slots` creators made by `make_creator`.
    ///
    /// Every finished task adds one unit of progress and wakes the waiters of
    /// `completed`. Must be called from within a tokio runtime.
    pub fn new<F>(
        name: impl Into<String>,
        slots: usize,
        mut make_creator: F,
        progress: Arc<dyn ProgressCounter>,
        completed: Arc<Notify>,
    ) -> Result<Self, SchedulerError>
    where
        F: FnMut() -> Box<dyn PchCreator>,
    {
        let name = name.into();
        if slots == 0 {
            return Err(SchedulerError::ZeroSlots(name));
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime(name.clone()))?;

        let idle_creators = (0..slots).map(|_| make_creator()).collect();

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                slots,
                state: Mutex::new(SlotState {
                    idle_creators,
                    backlog: VecDeque::new(),
                    running: 0,
                }),
                progress,
                completed,
                runtime,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn slots(&self) -> usize {
        self.inner.slots
    }

    /// Resolve once no task is running or waiting.
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.inner.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.slot_usage().used == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for SlotScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotScheduler")
            .field("name", &self.inner.name)
            .field("slots", &self.inner.slots)
            .field("usage", &self.slot_usage())
            .finish()
    }
}

impl TaskScheduler for SlotScheduler {
    fn slot_usage(&self) -> SlotUsage {
        let state = self.inner.lock_state();
        let used = state.running + state.backlog.len();
        SlotUsage {
            free: self.inner.slots.saturating_sub(used),
            used,
        }
    }

    fn add_tasks(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }

        let count = tasks.len();
        let ready: Vec<(Task, Box<dyn PchCreator>)> = {
            let mut state = self.inner.lock_state();
            let mut ready = Vec::new();
            for task in tasks {
                match state.idle_creators.pop() {
                    Some(creator) => {
                        state.running += 1;
                        ready.push((task, creator));
                    }
                    None => state.backlog.push_back(task),
                }
            }

            debug!(
                scheduler = %self.inner.name,
                accepted = count,
                running = state.running,
                waiting = state.backlog.len(),
                "Accepted tasks"
            );
            ready
        };

        for (task, creator) in ready {
            Inner::start(&self.inner, task, creator);
        }
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` on the runtime. The caller has already counted it as
    /// running and must not hold the state lock.
    fn start(this: &Arc<Self>, task: Task, creator: Box<dyn PchCreator>) {
        let mut guard = SlotGuard {
            inner: this.clone(),
            creator: Some(creator),
        };

        this.runtime.spawn(async move {
            let Some(creator) = guard.creator.as_deref_mut() else {
                return;
            };
            let creator: &mut dyn PchCreator = creator;

            if let Err(e) = task(creator).await {
                error!(scheduler = %guard.inner.name, error = %e, "PCH task failed");
            }
        });
    }

    /// Hand a slot's creator back and start the next waiting task with it.
    fn release(this: &Arc<Self>, creator: Box<dyn PchCreator>) {
        let next = {
            let mut state = this.lock_state();
            state.running = state.running.saturating_sub(1);

            match state.backlog.pop_front() {
                Some(task) => {
                    state.running += 1;
                    Some((task, creator))
                }
                None => {
                    state.idle_creators.push(creator);
                    None
                }
            }
        };

        if let Some((task, creator)) = next {
            Self::start(this, task, creator);
        }

        this.progress.add_progress(1);
        this.completed.notify_waiters();
    }
}

/// Owns a slot's creator while a task runs and returns it when dropped, also
/// when the task fails or panics.
struct SlotGuard {
    inner: Arc<Inner>,
    creator: Option<Box<dyn PchCreator>>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(creator) = self.creator.take() {
            Inner::release(&self.inner, creator);
        }
    }
}
