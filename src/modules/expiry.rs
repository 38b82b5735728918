//! Delayed expiry of idle automounts.
//!
//! Each registered entry carries at most one pending expiry task: a
//! one-shot worker that waits out the configured delay and then tries to
//! unmount the snapshot. Arming is idempotent while a task is pending, and
//! cancellation resolves one of three ways: the request wins the race and
//! the callback never runs, no task was pending (it already fired or never
//! existed), or the callback is mid-flight and the cancel blocks until it
//! completes. The entry reference held by a task is an `Arc` clone, so
//! whichever side finishes last releases it automatically.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use super::entry::SnapEntry;
use super::manager::MountCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    /// Timer armed, callback not started.
    Waiting,
    /// Canceled before the callback ran.
    Canceled,
    /// The callback is running or has finished.
    Firing,
}

struct Shared {
    state: Mutex<TaskState>,
    cond: Condvar,
}

/// Handle to one pending delayed-expiry task.
pub(crate) struct ExpiryTask {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl ExpiryTask {
    /// Asks the worker to stop before it fires. Returns true when the
    /// request won the race with the timer.
    fn request_cancel(&self) -> bool {
        let mut state = self.shared.state.lock();
        if *state == TaskState::Waiting {
            *state = TaskState::Canceled;
            self.shared.cond.notify_one();
            true
        } else {
            false
        }
    }
}

/// Arms a delayed unmount for `entry` unless one is already scheduled.
///
/// A zero delay disables expiry entirely. When a task is already pending
/// this is a no-op: if that task fails to unmount it reschedules itself,
/// and if it succeeds there is nothing left to do. Callers wanting a fresh
/// deadline cancel first.
pub(crate) fn arm(core: Arc<MountCore>, entry: Arc<SnapEntry>, delay: Duration) {
    if delay.is_zero() {
        return;
    }

    let mut slot = entry.task.lock();
    if slot.is_some() {
        return;
    }

    let shared = Arc::new(Shared {
        state: Mutex::new(TaskState::Waiting),
        cond: Condvar::new(),
    });
    let worker = {
        let shared = shared.clone();
        let entry = entry.clone();
        thread::spawn(move || run_timer(core, entry, shared, delay))
    };

    debug!("armed expiry of {} in {:?}", entry.name(), delay);
    *slot = Some(ExpiryTask { shared, worker });
}

/// Cancels any pending expiry for `entry` and empties its task slot.
///
/// When the callback is already mid-flight this blocks until it completes,
/// so the caller observes a settled mount state afterwards.
pub(crate) fn cancel(entry: &SnapEntry) {
    let task = entry.task.lock().take();
    let Some(task) = task else {
        // Already fired or never scheduled; the worker released its own
        // reference.
        return;
    };

    if task.request_cancel() {
        debug!("canceled expiry of {}", entry.name());
        return;
    }

    // Raced with the timer: the callback is running. Wait it out.
    if task.worker.join().is_err() {
        error!("expiry worker for {} panicked", entry.name());
    }
}

fn run_timer(core: Arc<MountCore>, entry: Arc<SnapEntry>, shared: Arc<Shared>, delay: Duration) {
    let deadline = Instant::now() + delay;

    {
        let mut state = shared.state.lock();
        while *state == TaskState::Waiting {
            if shared.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if *state == TaskState::Canceled {
            return;
        }
        *state = TaskState::Firing;
    }

    expire(core, entry, delay);
}

/// Expiry callback: unmount the idle snapshot, or retry later if it is
/// still busy.
fn expire(core: Arc<MountCore>, entry: Arc<SnapEntry>, delay: Duration) {
    // Empty the slot first so a reschedule can arm a fresh task.
    entry.task.lock().take();

    if core.config.expire_after.is_zero() {
        return;
    }

    let name = entry.name();
    match core.expire_unmount(&entry) {
        Ok(()) => debug!("expired automount {name}"),
        Err(err) => debug!("expiry of {name} failed ({err}), rescheduling"),
    }

    // Reschedule with the same base delay if the entry survived the
    // attempt, typically because the mount was busy.
    if let Some(se) = core.registry.find_by_dataset(entry.pool_id, entry.dataset_id) {
        arm(core.clone(), se, delay);
    }
}
