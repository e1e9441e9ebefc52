//! Cancellable background jobs and the worker that runs them.
//!
//! A [`JobSlot`] is a long-lived slot for one *kind* of background work
//! ("search matcher", "rating filler").  At most one computation per slot is
//! in flight at a time; callers cycle it through revive → submit → ready →
//! kill for the life of the application.  Cancellation is cooperative: the
//! async body polls a [`CancelToken`] and returns early, discarding partial
//! output.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

// ───────────────────────────────────────── slot state ────────

struct SlotState {
    /// Cancellation flag.  `true` when the slot is unclaimed or a kill has
    /// been requested; job bodies poll this through [`CancelToken`].
    dead: AtomicBool,
    /// Set once the async body has returned, even when it returned early
    /// because of cancellation.
    ready: AtomicBool,
    /// Bumped on every revive.  A completion stamped with an older epoch
    /// belongs to an abandoned run and is discarded instead of being
    /// mistaken for the current submission's result.
    epoch: AtomicU64,
    /// Submissions currently queued or running on the worker.
    in_flight: AtomicUsize,
    /// Pairs with `done` for the bounded teardown wait.
    gate: Mutex<()>,
    done: Condvar,
}

/// Cooperative cancellation handle passed into job bodies.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<SlotState>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.state.dead.load(Ordering::Relaxed)
    }
}

// ───────────────────────────────────────── job slot ──────────

/// One reusable slot per background-job kind.
///
/// The output value is the job's private working buffer: the body hands it
/// over on completion and the update thread takes it only after observing
/// [`JobSlot::is_ready`], so catalog data is never touched from the worker.
pub struct JobSlot<T> {
    state: Arc<SlotState>,
    out: Arc<Mutex<Option<T>>>,
    kind: &'static str,
    teardown: Duration,
}

impl<T: Send + 'static> JobSlot<T> {
    /// A new slot starts dead (unclaimed) with nothing scheduled.
    pub fn new(kind: &'static str, teardown: Duration) -> Self {
        Self {
            state: Arc::new(SlotState {
                dead: AtomicBool::new(true),
                ready: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                gate: Mutex::new(()),
                done: Condvar::new(),
            }),
            out: Arc::new(Mutex::new(None)),
            kind,
            teardown,
        }
    }

    /// True iff the slot is not currently claimed by an in-flight
    /// computation (freshly created, or killed).
    pub fn is_dead(&self) -> bool {
        self.state.dead.load(Ordering::Relaxed)
    }

    /// True once the async body has returned for the current epoch.
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    /// True while a submission is queued or running on the worker.
    pub fn is_scheduled(&self) -> bool {
        self.state.in_flight.load(Ordering::Acquire) > 0
    }

    /// Request cancellation.  Takes effect the next time the body polls its
    /// token; in-progress per-entry work is not interrupted.  Also clears
    /// readiness, moving an `AsyncReady` slot back toward dead.  No-op on an
    /// already-dead slot.
    pub fn kill(&self) {
        self.state.dead.store(true, Ordering::Relaxed);
        self.state.ready.store(false, Ordering::Release);
    }

    /// Claim the slot for a new run: clears the dead/ready flags, drops any
    /// stale buffered result and bumps the epoch so late completions from an
    /// abandoned run are discarded.
    ///
    /// Callers must have gone through [`JobSlot::shutdown`] first (or never
    /// submitted).  Reviving while a timed-out run is still on the worker is
    /// the accepted abandonment path; calling revive twice in a row just
    /// re-enters the same claimed state and submits nothing by itself.
    pub fn revive(&self) {
        if self.is_scheduled() && self.is_dead() {
            debug!(kind = self.kind, "reviving over an abandoned in-flight run");
        }
        self.state.epoch.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut slot) = self.out.lock() {
            *slot = None;
        }
        self.state.ready.store(false, Ordering::Release);
        self.state.dead.store(false, Ordering::Relaxed);
    }

    /// Drop any claim on the slot without preparing a new run.  The epoch is
    /// bumped so a straggling completion from an abandoned run is discarded,
    /// the buffer is cleared, and the slot returns to dead.  Callers use
    /// this instead of a bare [`JobSlot::kill`] when they will not revive
    /// again soon.
    pub fn retire(&self) {
        self.state.epoch.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut slot) = self.out.lock() {
            *slot = None;
        }
        self.state.ready.store(false, Ordering::Release);
        self.state.dead.store(true, Ordering::Relaxed);
    }

    /// Forced-cancellation teardown: kill, then wait (bounded by the slot's
    /// teardown budget) for the body to return.  Returns `false` when the
    /// deadline elapsed first and the run was abandoned still in flight —
    /// a logged, accepted degradation, not an error.
    pub fn shutdown(&self) -> bool {
        self.kill();
        if !self.is_scheduled() {
            return true;
        }

        let guard = match self.state.gate.lock() {
            Ok(g) => g,
            Err(_) => return self.is_ready(),
        };
        let wait = self.state.done.wait_timeout_while(guard, self.teardown, |_| {
            !self.state.ready.load(Ordering::Acquire) && self.state.in_flight.load(Ordering::Acquire) > 0
        });
        let finished = match wait {
            Ok((_, timeout)) => !timeout.timed_out() || self.is_ready() || !self.is_scheduled(),
            Err(_) => self.is_ready(),
        };
        if !finished {
            warn!(
                kind = self.kind,
                timeout_ms = self.teardown.as_millis() as u64,
                "cancellation timed out; abandoning in-flight job"
            );
        }
        finished
    }

    /// Hand the body to the runner.  The slot must have been revived; a
    /// submit on a dead slot is dropped with a warning rather than queueing
    /// work that would cancel itself immediately.
    pub fn submit<F>(&self, runner: &JobRunner, priority: Priority, body: F)
    where
        F: FnOnce(&CancelToken) -> Option<T> + Send + 'static,
    {
        if self.is_dead() {
            warn!(kind = self.kind, "submit on a dead slot ignored");
            return;
        }

        let state = Arc::clone(&self.state);
        let out = Arc::clone(&self.out);
        let epoch = state.epoch.load(Ordering::Acquire);
        let kind = self.kind;
        state.in_flight.fetch_add(1, Ordering::AcqRel);

        runner.schedule(
            priority,
            Box::new(move || {
                let token = CancelToken {
                    state: Arc::clone(&state),
                };
                let value = body(&token);
                finish(&state, &out, epoch, value, kind);
            }),
        );
    }

    /// Take the buffered result.  Only meaningful after [`JobSlot::is_ready`]
    /// was observed on the update thread; a cancelled run leaves `None`.
    pub fn take_result(&self) -> Option<T> {
        self.out.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Worker-side completion: publish the result and wake any teardown waiter.
/// Runs on the worker thread, so it only touches the slot's shared state.
fn finish<T>(state: &SlotState, out: &Mutex<Option<T>>, epoch: u64, value: Option<T>, kind: &str) {
    state.in_flight.fetch_sub(1, Ordering::AcqRel);

    let _guard = match state.gate.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };

    if state.epoch.load(Ordering::Acquire) != epoch {
        debug!(kind, "discarding completion from an abandoned run");
        // Wake waiters anyway so a concurrent shutdown re-checks in_flight.
        state.done.notify_all();
        return;
    }

    if let Some(v) = value {
        if let Ok(mut slot) = out.lock() {
            *slot = Some(v);
        }
    }
    state.ready.store(true, Ordering::Release);
    state.done.notify_all();
}

// ───────────────────────────────────────── runner ────────────

/// Queue position for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Back of the queue — maintenance work like rating fills.
    Background,
    /// Front of the queue — user-facing work like search matching.
    Interactive,
}

type Task = Box<dyn FnOnce() + Send + 'static>;

struct RunnerShared {
    queue: Mutex<VecDeque<Task>>,
    available: Condvar,
    stop: AtomicBool,
}

/// Executes queued job bodies on a single background worker thread, which
/// serializes submissions: only one job starts imminently, the rest wait
/// their turn.
pub struct JobRunner {
    shared: Arc<RunnerShared>,
}

impl JobRunner {
    /// Threaded runner — spawns the worker immediately.
    pub fn new() -> Self {
        let runner = Self::manual();
        let shared = Arc::clone(&runner.shared);
        std::thread::spawn(move || worker_loop(&shared));
        runner
    }

    /// Manual runner — no worker thread; queued tasks sit until pumped.
    /// Deterministic scheduling driver for the test suites.
    pub fn manual() -> Self {
        Self {
            shared: Arc::new(RunnerShared {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                stop: AtomicBool::new(false),
            }),
        }
    }

    fn schedule(&self, priority: Priority, task: Task) {
        if let Ok(mut queue) = self.shared.queue.lock() {
            match priority {
                Priority::Background => queue.push_back(task),
                Priority::Interactive => queue.push_front(task),
            }
        }
        self.shared.available.notify_one();
    }

    /// Number of tasks waiting for a worker slot.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Drain the queue on the calling thread.  Returns how many tasks ran.
    #[cfg(test)]
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = match self.shared.queue.lock() {
                Ok(mut queue) => queue.pop_front(),
                Err(_) => None,
            };
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        // Let the worker exit; never join — an abandoned job body may still
        // be mid-flight and must not block application teardown.
        self.shared.stop.store(true, Ordering::Relaxed);
        self.shared.available.notify_all();
    }
}

fn worker_loop(shared: &RunnerShared) {
    loop {
        let task = {
            let mut queue = match shared.queue.lock() {
                Ok(g) => g,
                Err(_) => return,
            };
            loop {
                if shared.stop.load(Ordering::Relaxed) {
                    return;
                }
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                queue = match shared.available.wait(queue) {
                    Ok(g) => g,
                    Err(_) => return,
                };
            }
        };
        task();
    }
}

// ───────────────────────────────────────── tests ─────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn slot(teardown_ms: u64) -> JobSlot<u32> {
        JobSlot::new("test", Duration::from_millis(teardown_ms))
    }

    #[test]
    fn test_new_slot_starts_dead_and_not_ready() {
        let s = slot(100);
        assert!(s.is_dead());
        assert!(!s.is_ready());
        assert!(!s.is_scheduled());
    }

    #[test]
    fn test_kill_on_dead_slot_is_noop() {
        let s = slot(100);
        s.kill();
        s.kill();
        assert!(s.is_dead());
        assert!(!s.is_ready());
        assert!(!s.is_scheduled());
    }

    #[test]
    fn test_submit_runs_and_buffers_result() {
        let runner = JobRunner::manual();
        let s = slot(100);
        s.revive();
        s.submit(&runner, Priority::Background, |_| Some(42));

        assert!(!s.is_ready());
        assert_eq!(runner.run_pending(), 1);
        assert!(s.is_ready());
        assert_eq!(s.take_result(), Some(42));

        s.kill();
        assert!(s.is_dead());
        assert!(!s.is_ready());
    }

    #[test]
    fn test_revive_twice_submits_nothing_by_itself() {
        let runner = JobRunner::manual();
        let s = slot(100);
        s.revive();
        s.revive();
        assert_eq!(runner.pending(), 0);

        s.submit(&runner, Priority::Background, |_| Some(1));
        assert_eq!(runner.pending(), 1);
    }

    #[test]
    fn test_submit_on_dead_slot_is_dropped() {
        let runner = JobRunner::manual();
        let s = slot(100);
        s.submit(&runner, Priority::Background, |_| Some(1));
        assert_eq!(runner.pending(), 0);
    }

    #[test]
    fn test_cancelled_body_still_reports_ready() {
        let runner = JobRunner::manual();
        let s = slot(100);
        s.revive();
        s.submit(&runner, Priority::Background, |token| {
            if token.is_cancelled() {
                return None;
            }
            Some(7)
        });

        s.kill();
        runner.run_pending();

        assert!(s.is_ready(), "early-cancelled body must still flip ready");
        assert_eq!(s.take_result(), None);
    }

    #[test]
    fn test_interactive_submissions_jump_the_queue() {
        let runner = JobRunner::manual();
        let order = Arc::new(Mutex::new(Vec::new()));

        let a = slot(100);
        a.revive();
        let log = Arc::clone(&order);
        a.submit(&runner, Priority::Background, move |_| {
            log.lock().ok()?.push("background");
            Some(0)
        });

        let b = slot(100);
        b.revive();
        let log = Arc::clone(&order);
        b.submit(&runner, Priority::Interactive, move |_| {
            log.lock().ok()?.push("interactive");
            Some(0)
        });

        runner.run_pending();
        let order = order.lock().ok().map(|o| o.clone()).unwrap_or_default();
        assert_eq!(order, vec!["interactive", "background"]);
    }

    #[test]
    fn test_shutdown_waits_for_completion() {
        let runner = JobRunner::new();
        let s = slot(2000);
        s.revive();
        s.submit(&runner, Priority::Background, |_| {
            std::thread::sleep(Duration::from_millis(50));
            Some(5)
        });

        assert!(s.shutdown(), "body finishes well inside the teardown budget");
        assert!(s.is_ready());
    }

    #[test]
    fn test_shutdown_with_nothing_scheduled_returns_immediately() {
        let s = slot(5000);
        let started = Instant::now();
        assert!(s.shutdown());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_shutdown_timeout_abandons_and_discards_stale_completion() {
        let runner = JobRunner::new();
        let s = slot(50);
        s.revive();
        s.submit(&runner, Priority::Background, |_| {
            // Ignores its token entirely — simulates a body that never
            // observes cancellation in time.
            std::thread::sleep(Duration::from_millis(400));
            Some(111)
        });

        let started = Instant::now();
        assert!(!s.shutdown(), "deadline must elapse before the body returns");
        assert!(
            started.elapsed() < Duration::from_millis(350),
            "shutdown must return within its bound"
        );

        // Re-submission over the abandoned run: the accepted relaxation.
        s.revive();
        s.submit(&runner, Priority::Interactive, |_| Some(222));

        let deadline = Instant::now() + Duration::from_secs(2);
        while !s.is_ready() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(s.take_result(), Some(222));
        s.kill();

        // Let the abandoned body finish; its stale-epoch completion must not
        // resurrect readiness or overwrite the buffer.
        std::thread::sleep(Duration::from_millis(500));
        assert!(!s.is_ready());
        assert_eq!(s.take_result(), None);
    }
}
