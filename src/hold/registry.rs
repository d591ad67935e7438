use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::foundation::error::{WavyteError, WavyteResult};
use crate::foundation::time::{MonotonicTime, TimeSource};

/// Default timeout applied when a hold does not specify one.
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_secs(30);

/// Token returned by [`HoldRegistry::hold_render`]. Handles are strictly increasing for the
/// lifetime of a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HoldHandle(pub u64);

impl std::fmt::Display for HoldHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-hold options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HoldOpts {
    /// Timeout for this hold; `None` uses the registry default.
    pub timeout: Option<Duration>,
}

impl HoldOpts {
    /// Options with an explicit timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[derive(Debug)]
struct HoldEntry {
    label: String,
    deadline: Option<Duration>,
    timeout_ms: u64,
}

#[derive(Debug)]
enum Fatal {
    Timeout {
        handle: u64,
        label: String,
        timeout_ms: u64,
    },
    Aborted(String),
}

impl Fatal {
    fn to_error(&self) -> WavyteError {
        match self {
            Self::Timeout {
                handle,
                label,
                timeout_ms,
            } => WavyteError::HoldTimeout {
                handle: *handle,
                label: label.clone(),
                timeout_ms: *timeout_ms,
            },
            Self::Aborted(msg) => WavyteError::Aborted(msg.clone()),
        }
    }
}

#[derive(Debug)]
struct RegistryState {
    next_handle: u64,
    pending: BTreeMap<u64, HoldEntry>,
    fatal: Option<Fatal>,
    default_timeout: Option<Duration>,
}

/// Session-scoped table of outstanding render holds.
///
/// A hold says "the current frame is not ready yet". The capture driver waits until
/// [`pending_count`](Self::pending_count) reaches zero before capturing. Clones share the same
/// table, so adapters and the driver can each keep one.
///
/// Timeouts are deadlines against the registry's [`TimeSource`]; they are detected by
/// [`poll`](Self::poll), which the driver calls on every wait iteration. The first timeout or
/// abort is sticky until [`reset`](Self::reset).
#[derive(Clone, Debug)]
pub struct HoldRegistry {
    state: Arc<Mutex<RegistryState>>,
    time: Arc<dyn TimeSource>,
}

impl Default for HoldRegistry {
    fn default() -> Self {
        Self::new(Arc::new(MonotonicTime::new()))
    }
}

impl HoldRegistry {
    /// Empty registry using `time` for deadlines and [`DEFAULT_HOLD_TIMEOUT`].
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                next_handle: 1,
                pending: BTreeMap::new(),
                fatal: None,
                default_timeout: Some(DEFAULT_HOLD_TIMEOUT),
            })),
            time,
        }
    }

    /// Replace the timeout applied to holds taken without one. `None` disables it.
    pub fn with_default_timeout(self, timeout: Option<Duration>) -> Self {
        self.lock().default_timeout = timeout;
        self
    }

    /// Time source shared with adapters that need cooldowns.
    pub fn time(&self) -> Arc<dyn TimeSource> {
        Arc::clone(&self.time)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a hold; the frame is not ready until it is released.
    pub fn hold_render(&self, label: Option<&str>, opts: HoldOpts) -> HoldHandle {
        let now = self.time.now();
        let mut st = self.lock();
        let handle = st.next_handle;
        st.next_handle += 1;

        let timeout = opts.timeout.or(st.default_timeout);
        let label = label.map_or_else(|| format!("hold #{handle}"), str::to_owned);
        tracing::debug!(handle, label = %label, ?timeout, "render hold acquired");
        st.pending.insert(
            handle,
            HoldEntry {
                label,
                deadline: timeout.map(|t| now.saturating_add(t)),
                timeout_ms: timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            },
        );
        HoldHandle(handle)
    }

    /// Register a hold released when the returned guard is dropped.
    pub fn hold_scoped(&self, label: Option<&str>, opts: HoldOpts) -> HoldGuard {
        HoldGuard {
            handle: self.hold_render(label, opts),
            registry: self.clone(),
            released: false,
        }
    }

    /// Release a pending hold. Releasing an unknown, released or evicted handle is an error.
    pub fn release_render(&self, handle: HoldHandle) -> WavyteResult<()> {
        let mut st = self.lock();
        match st.pending.remove(&handle.0) {
            Some(entry) => {
                tracing::debug!(handle = handle.0, label = %entry.label, "render hold released");
                Ok(())
            }
            None => Err(WavyteError::UnknownHold(handle.0)),
        }
    }

    /// Number of outstanding holds.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Labels of outstanding holds, oldest first.
    pub fn pending_labels(&self) -> Vec<String> {
        self.lock()
            .pending
            .values()
            .map(|e| e.label.clone())
            .collect()
    }

    /// `true` when `handle` is still outstanding.
    pub fn is_pending(&self, handle: HoldHandle) -> bool {
        self.lock().pending.contains_key(&handle.0)
    }

    /// Earliest deadline among outstanding holds.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.lock().pending.values().filter_map(|e| e.deadline).min()
    }

    /// Evict expired holds and report the first fatal condition, if any.
    pub fn poll(&self) -> WavyteResult<()> {
        let now = self.time.now();
        let mut st = self.lock();

        let mut expired: Vec<(Duration, u64)> = st
            .pending
            .iter()
            .filter_map(|(h, e)| e.deadline.filter(|d| *d <= now).map(|d| (d, *h)))
            .collect();
        expired.sort_unstable();

        for (_, handle) in expired {
            let Some(entry) = st.pending.remove(&handle) else {
                continue;
            };
            tracing::error!(
                handle,
                label = %entry.label,
                timeout_ms = entry.timeout_ms,
                "render hold timed out"
            );
            if st.fatal.is_none() {
                st.fatal = Some(Fatal::Timeout {
                    handle,
                    label: entry.label,
                    timeout_ms: entry.timeout_ms,
                });
            }
        }

        match &st.fatal {
            Some(fatal) => Err(fatal.to_error()),
            None => Ok(()),
        }
    }

    /// Record an out-of-band fatal abort and return the matching error.
    pub fn abort_render(&self, message: impl Into<String>) -> WavyteError {
        let message = message.into();
        tracing::error!(message = %message, "render aborted");
        let mut st = self.lock();
        if st.fatal.is_none() {
            st.fatal = Some(Fatal::Aborted(message.clone()));
        }
        WavyteError::Aborted(message)
    }

    /// Drop every pending hold and any recorded failure. Handles keep increasing.
    pub fn reset(&self) {
        let mut st = self.lock();
        if !st.pending.is_empty() {
            tracing::debug!(dropped = st.pending.len(), "hold registry reset");
        }
        st.pending.clear();
        st.fatal = None;
    }
}

/// Scoped hold; releases on [`release`](Self::release) or on drop.
#[must_use = "dropping the guard releases the hold immediately"]
#[derive(Debug)]
pub struct HoldGuard {
    registry: HoldRegistry,
    handle: HoldHandle,
    released: bool,
}

impl HoldGuard {
    /// Handle of the guarded hold.
    pub fn handle(&self) -> HoldHandle {
        self.handle
    }

    /// Release now, reporting an error if the hold was already evicted.
    pub fn release(mut self) -> WavyteResult<()> {
        self.released = true;
        self.registry.release_render(self.handle)
    }
}

impl Drop for HoldGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.registry.release_render(self.handle) {
            tracing::debug!(handle = self.handle.0, %err, "scoped hold was already gone");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/hold/registry.rs"]
mod tests;
