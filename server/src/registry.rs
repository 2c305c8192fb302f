//! Process-wide registry of spawned server pids.
//!
//! Every server the supervisor spawns is registered here so an embedding
//! application can terminate stragglers at shutdown with
//! [`terminate_all`]. The registry is append-only during normal operation
//! and drained exactly once per [`terminate_all`] call; `kill_on_drop` on
//! the child handle backstops abnormal exits.

use std::sync::Mutex;

static REGISTRY: Mutex<Vec<u32>> = Mutex::new(Vec::new());

pub(crate) fn register(pid: u32) {
    lock().push(pid);
    tracing::debug!(pid, "registered server process");
}

pub(crate) fn unregister(pid: u32) {
    lock().retain(|&p| p != pid);
}

/// Terminate every still-registered server process.
///
/// Drains the registry, so a second call is a no-op. Signal delivery is
/// best-effort; already-exited pids are ignored.
pub fn terminate_all() {
    let pids = std::mem::take(&mut *lock());
    for pid in pids {
        tracing::info!(pid, "terminating server process");
        terminate(pid);
    }
}

fn lock() -> std::sync::MutexGuard<'static, Vec<u32>> {
    REGISTRY
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(unix)]
fn terminate(pid: u32) {
    // SAFETY: kill(2) with SIGTERM has no memory-safety preconditions.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) {
    // Windows has no SIGTERM equivalent worth emulating here;
    // kill_on_drop covers local servers when the handle drops.
}

// Signal delivery is covered by tests/registry_shutdown.rs — calling
// `terminate_all` here would drain pids registered by concurrently
// running supervisor tests in this binary.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregister_removes_pid() {
        // Above the kernel's PID_MAX_LIMIT, so never a live process.
        register(5_000_000);
        register(5_000_001);
        unregister(5_000_000);
        assert!(!lock().contains(&5_000_000));
        assert!(lock().contains(&5_000_001));
        unregister(5_000_001);
    }
}
