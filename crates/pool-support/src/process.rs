use tracing::warn;

/// Handle to the OS process backing a launched browser, for the hard
/// `SIGKILL` escape hatch in spec §4.1 ("Kill algorithm" step 2).
///
/// Kill paths must tolerate a missing/already-reaped process — the spec
/// calls out the observed Node.js failure mode ("Cannot read property 'kill'
/// of null") as the thing a Rust port must not reproduce; `Option<OsProcessHandle>`
/// plus a no-op `kill()` on a missing handle is the direct fix.
#[derive(Debug, Clone, Copy)]
pub struct OsProcessHandle {
    pid: u32,
}

impl OsProcessHandle {
    pub fn from_pid(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Best-effort hard kill. Errors are logged, never propagated — by the
    /// time this runs the cooperative `close()` has already been given its
    /// chance (spec §4.1, "Kill algorithm").
    pub fn kill(&self) {
        #[cfg(unix)]
        {
            // SAFETY: `kill(2)` with SIGKILL on a pid we recorded from a
            // successful launch; a stale pid simply returns ESRCH, handled below.
            let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                warn!(pid = self.pid, "SIGKILL failed (process likely already gone)");
            }
        }
        #[cfg(not(unix))]
        {
            warn!(
                pid = self.pid,
                "hard process kill is not implemented on this platform"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_on_bogus_pid_does_not_panic() {
        // A pid this large is extremely unlikely to be live; this exercises
        // the "tolerate a missing process" path without spawning anything.
        let handle = OsProcessHandle::from_pid(u32::MAX);
        handle.kill();
    }
}
