/// Fixed-size worker pool.
///
/// Workers sleep on a condition variable until a task or the stop signal
/// arrives. The pool tracks how many workers are mid-task under the same
/// lock as the queue, so `wait()` can observe "queue empty and every worker
/// idle" as one consistent state.
use crate::error::{RenderError, RenderResult};
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static IS_POOL_WORKER: Cell<bool> = const { Cell::new(false) };
}

struct PoolState {
    queue: VecDeque<Job>,
    /// Workers that have dequeued a job and not yet finished it.
    busy: usize,
    stopping: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    work_ready: Condvar,
    drained: Condvar,
}

pub struct TaskExecutor {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
}

/// Completion handle for a task submitted with [`TaskExecutor::submit`].
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<RenderResult<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has run and return its value.
    pub fn join(self) -> RenderResult<T> {
        self.receiver
            .recv()
            .map_err(|_| RenderError::TaskPanicked("task dropped before completion".into()))?
    }
}

impl TaskExecutor {
    /// Spawn a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> RenderResult<Self> {
        let thread_count = threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                busy: 0,
                stopping: false,
            }),
            work_ready: Condvar::new(),
            drained: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("raster-worker-{index}"))
                .spawn(move || worker_loop(&worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Release whatever was already started before bailing out.
                    shared.state.lock().stopping = true;
                    shared.work_ready.notify_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(err.into());
                }
            }
        }

        tracing::info!(threads = thread_count, "task executor started");

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            thread_count,
        })
    }

    /// Pool sized to the detected hardware parallelism.
    pub fn with_default_threads() -> RenderResult<Self> {
        Self::new(default_thread_count())
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// True when called from one of the pool's worker threads.
    pub fn is_worker_thread() -> bool {
        IS_POOL_WORKER.with(Cell::get)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopping
    }

    /// Queue `work` and return a handle to its result.
    pub fn submit<F, T>(&self, work: F) -> RenderResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.push(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                .map_err(|payload| RenderError::from_panic(payload.as_ref()));
            // The caller may have dropped the handle; that is fine.
            let _ = sender.send(outcome);
        }))?;
        Ok(TaskHandle { receiver })
    }

    pub(crate) fn push(&self, job: Job) -> RenderResult<()> {
        {
            let mut state = self.shared.state.lock();
            if state.stopping {
                return Err(RenderError::ExecutorStopped);
            }
            state.queue.push_back(job);
        }
        self.shared.work_ready.notify_one();
        Ok(())
    }

    /// Block until no task is queued and no worker is running one.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while !(state.queue.is_empty() && state.busy == 0) {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Stop accepting work, let the workers drain the queue, then join them.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stopping = true;
        }
        self.shared.work_ready.notify_all();

        if Self::is_worker_thread() {
            tracing::warn!("shutdown requested from a worker thread; skipping join");
            return;
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("worker thread terminated abnormally");
            }
        }
        tracing::info!(threads = self.thread_count, "task executor stopped");
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn default_thread_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1)
}

fn worker_loop(shared: &Shared) {
    IS_POOL_WORKER.with(|flag| flag.set(true));

    loop {
        let job = {
            let mut state = shared.state.lock();
            while !state.stopping && state.queue.is_empty() {
                shared.work_ready.wait(&mut state);
            }
            match state.queue.pop_front() {
                Some(job) => {
                    state.busy += 1;
                    job
                }
                // Stopping and fully drained.
                None => return,
            }
        };

        // Jobs route their own panics to their handles; this only keeps the
        // worker (and the busy counter) intact if one slips through.
        let _ = panic::catch_unwind(AssertUnwindSafe(job));

        let mut state = shared.state.lock();
        state.busy -= 1;
        if state.busy == 0 && state.queue.is_empty() {
            shared.drained.notify_all();
        }
    }
}
