//! Process-wide registry of temp artifacts to delete on exit or on demand.
//!
//! This is the one intentionally global piece of state in the workspace:
//! artifact cleanup belongs to the process, not to any broker instance.
//! Cleanup is best-effort everywhere and never raises.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tracing::debug;

static TARGETS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn sweep_on_exit() {
    cleanup();
}

/// Idempotently registers the process-exit sweep. Returns whether the hook
/// is in place; safe to call from any thread, any number of times.
pub fn install() -> bool {
    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return true;
    }
    // atexit returns nonzero when the hook cannot be registered.
    if unsafe { libc::atexit(sweep_on_exit) } != 0 {
        HOOK_INSTALLED.store(false, Ordering::SeqCst);
        return false;
    }
    true
}

pub fn is_installed() -> bool {
    HOOK_INSTALLED.load(Ordering::SeqCst)
}

pub fn add_target(target: impl Into<PathBuf>) {
    targets().push(target.into());
}

pub fn remove_target(target: &Path) {
    targets().retain(|candidate| candidate != target);
}

/// Deletes `target` immediately and drops it from the sweep list.
pub fn clean(target: &Path) {
    let mut targets = targets();
    delete(target);
    targets.retain(|candidate| candidate != target);
}

/// Best-effort sweep of every registered target. Permission and not-found
/// failures are swallowed; swept entries stay deregistered.
pub fn cleanup() {
    let mut targets = targets();
    for target in targets.drain(..) {
        delete(&target);
    }
}

fn delete(target: &Path) {
    if let Err(err) = std::fs::remove_file(target) {
        debug!(target = %target.display(), %err, "cleanup delete skipped");
    }
}

fn targets() -> MutexGuard<'static, Vec<PathBuf>> {
    match TARGETS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
