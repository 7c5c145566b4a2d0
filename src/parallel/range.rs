/// Parallel range runner.
///
/// Workers pull indices one at a time from a shared, mutex-guarded cursor,
/// so slow and fast workers balance themselves without any static chunking.
/// The call is a barrier: it returns only after every dispatched worker has
/// finished, which is also what lets `func` borrow from the caller's stack.
use super::executor::{Job, TaskExecutor};
use parking_lot::Mutex;
use std::any::Any;
use std::convert::Infallible;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

enum Failure<E> {
    Error(E),
    Panic(Box<dyn Any + Send>),
}

struct RangeShared<'f, F, E> {
    cursor: Mutex<usize>,
    end: usize,
    failure: Mutex<Option<Failure<E>>>,
    failed: AtomicBool,
    func: &'f F,
}

impl<'f, F, E> RangeShared<'f, F, E>
where
    F: Fn(usize, usize) -> Result<(), E> + Sync,
    E: Send,
{
    #[inline]
    fn next_index(&self) -> Option<usize> {
        let mut cursor = self.cursor.lock();
        if *cursor >= self.end {
            return None;
        }
        let index = *cursor;
        *cursor += 1;
        Some(index)
    }

    /// Keep only the first failure by arrival order.
    fn record(&self, failure: Failure<E>) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(failure);
            self.failed.store(true, Ordering::Release);
        }
    }

    fn drain(&self, worker: usize) {
        while let Some(index) = self.next_index() {
            match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(worker, index))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.record(Failure::Error(err)),
                Err(payload) => self.record(Failure::Panic(payload)),
            }
            if self.failed.load(Ordering::Acquire) {
                break;
            }
        }
    }

    fn into_result(self) -> Result<(), E> {
        match self.failure.into_inner() {
            None => Ok(()),
            Some(Failure::Error(err)) => Err(err),
            Some(Failure::Panic(payload)) => panic::resume_unwind(payload),
        }
    }
}

/// Waits on the executor when dropped, so no dispatched job can outlive the
/// borrows it was built from, even if the dispatch loop bails out early.
struct DrainGuard<'a>(&'a TaskExecutor);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}

/// Resolve a requested worker count against the pool size.
/// `None` and `Some(0)` mean "one per pool thread".
#[inline]
pub fn resolve_worker_count(requested: Option<usize>, pool_threads: usize) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => pool_threads,
    }
    .max(1)
}

/// Run `func(worker_index, index)` for every index in `range` on the pool.
///
/// The first failure (an `Err` or a panic inside `func`) stops further calls
/// into `func`; after all workers finish, an `Err` is returned and a panic is
/// resumed on the calling thread. Writes already performed for other indices
/// are not rolled back.
///
/// Called from a pool worker, the range runs inline on that thread instead
/// of waiting on a barrier that includes itself.
///
/// # Panics
///
/// Dispatching to a stopped executor is a programming error and panics with
/// the [`RenderError::ExecutorStopped`] message once already-queued workers
/// have finished.
///
/// [`RenderError::ExecutorStopped`]: crate::error::RenderError::ExecutorStopped
pub fn try_parallel_for<F, E>(
    executor: &TaskExecutor,
    range: Range<usize>,
    worker_count: Option<usize>,
    func: F,
) -> Result<(), E>
where
    F: Fn(usize, usize) -> Result<(), E> + Sync,
    E: Send,
{
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return Ok(());
    }

    let workers = resolve_worker_count(worker_count, executor.thread_count()).min(len);
    let shared = RangeShared {
        cursor: Mutex::new(range.start),
        end: range.end,
        failure: Mutex::new(None),
        failed: AtomicBool::new(false),
        func: &func,
    };

    if TaskExecutor::is_worker_thread() {
        shared.drain(0);
        return shared.into_result();
    }

    let mut rejected = None;
    {
        let _barrier = DrainGuard(executor);
        let shared_ref = &shared;
        for worker in 0..workers {
            let job: Box<dyn FnOnce() + Send + '_> = Box::new(move || shared_ref.drain(worker));
            // SAFETY: `_barrier` waits for the pool to drain before `shared`
            // and `func` go out of scope, on every exit path of this block.
            let job = unsafe { erase_job_lifetime(job) };
            if let Err(err) = executor.push(job) {
                rejected = Some(err);
                break;
            }
        }
    }

    if let Some(err) = rejected {
        tracing::error!(%err, "range dispatched to a stopped executor");
        panic!("{err}");
    }
    shared.into_result()
}

/// Infallible form of [`try_parallel_for`].
pub fn parallel_for<F>(
    executor: &TaskExecutor,
    range: Range<usize>,
    worker_count: Option<usize>,
    func: F,
) where
    F: Fn(usize, usize) + Sync,
{
    let result = try_parallel_for::<_, Infallible>(executor, range, worker_count, |worker, index| {
        func(worker, index);
        Ok(())
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

unsafe fn erase_job_lifetime<'a>(job: Box<dyn FnOnce() + Send + 'a>) -> Job {
    std::mem::transmute::<Box<dyn FnOnce() + Send + 'a>, Box<dyn FnOnce() + Send + 'static>>(job)
}
