// TapShake: Deferred Tasks
//
// Cancellable one-shot callbacks.  `ThreadScheduler` runs them on a single
// worker thread for live sensor streams; `ManualScheduler` runs them when its
// clock is advanced, for replays and tests.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::{STACK_TIMER, TIMER_THREAD_NAME};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Facility that runs a task once its deadline has passed.
pub trait Scheduler: Send + Sync {
    fn schedule_at(&self, deadline: Instant, task: Task) -> TaskHandle;
}

/// Cancels a scheduled task.  Cancelling after it ran does nothing.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Entry {
    deadline: Instant,
    seq: u64,
    handle: TaskHandle,
    task: Task,
}

impl Entry {
    fn run(self) {
        if !self.handle.is_cancelled() {
            (self.task)();
        }
    }
}

// Min-heap on (deadline, seq): earliest first, FIFO among equal deadlines.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

// ---------------------------------------------------------------------------
// Thread-backed scheduler
// ---------------------------------------------------------------------------

enum Command {
    Schedule(Entry),
    Shutdown,
}

pub struct ThreadScheduler {
    tx: Sender<Command>,
    seq: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    pub fn new() -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();

        let worker = thread::Builder::new()
            .name(TIMER_THREAD_NAME.into())
            .stack_size(STACK_TIMER)
            .spawn(move || {
                log::debug!("Timer thread started");
                let mut pending: BinaryHeap<Entry> = BinaryHeap::new();

                loop {
                    let command = match pending.peek() {
                        Some(next) => {
                            let wait = next.deadline.saturating_duration_since(Instant::now());
                            match rx.recv_timeout(wait) {
                                Ok(command) => Some(command),
                                Err(RecvTimeoutError::Timeout) => None,
                                Err(RecvTimeoutError::Disconnected) => break,
                            }
                        }
                        None => match rx.recv() {
                            Ok(command) => Some(command),
                            Err(_) => break,
                        },
                    };

                    match command {
                        Some(Command::Schedule(entry)) => pending.push(entry),
                        Some(Command::Shutdown) => break,
                        None => {}
                    }

                    let now = Instant::now();
                    while pending.peek().is_some_and(|e| e.deadline <= now) {
                        if let Some(entry) = pending.pop() {
                            entry.run();
                        }
                    }
                }
                log::debug!("Timer thread exiting ({} task(s) dropped)", pending.len());
            })?;

        Ok(Self {
            tx,
            seq: AtomicU64::new(0),
            worker: Some(worker),
        })
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule_at(&self, deadline: Instant, task: Task) -> TaskHandle {
        let handle = TaskHandle::default();
        let entry = Entry {
            deadline,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            handle: handle.clone(),
            task,
        };
        if self.tx.send(Command::Schedule(entry)).is_err() {
            log::warn!("Timer thread gone; deferred task dropped");
            handle.cancel();
        }
        handle
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            // A task that drops the last reference would otherwise join itself.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manually clocked scheduler
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task due at or before `now`, earliest first.  Tasks may
    /// schedule further tasks; those run too if already due.  Returns how many
    /// callbacks actually ran.
    pub fn advance_to(&self, now: Instant) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                match pending.peek() {
                    Some(e) if e.deadline <= now => pending.pop(),
                    _ => None,
                }
            };
            let Some(entry) = next else { break };
            if !entry.handle.is_cancelled() {
                ran += 1;
            }
            entry.run();
        }
        ran
    }

    /// Tasks still queued, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_at(&self, deadline: Instant, task: Task) -> TaskHandle {
        let handle = TaskHandle::default();
        let entry = Entry {
            deadline,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            handle: handle.clone(),
            task,
        };
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        handle
    }
}
