use crate::channel::ChannelDirectory;
use crate::position::ContentPath;
use crate::store::{CoordinationStore, StoreError};
use crate::time::ParseError;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Pacing applied between version-conflict retries. Conflicts restart the
/// read/compute/write cycle without a cap, so the policy bounds the spin
/// rate rather than the attempt count.
pub trait Backoff {
    fn pause(&self, attempt: u32);
}

/// Exponential pause doubling from `base` up to `cap`.
#[derive(Debug, Clone)]
pub struct CappedExponential {
    base: Duration,
    cap: Duration,
}

impl CappedExponential {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }
}

impl Default for CappedExponential {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(10),
            cap: Duration::from_secs(1),
        }
    }
}

impl Backoff for CappedExponential {
    fn pause(&self, attempt: u32) {
        let factor = 2_u32.saturating_pow(attempt.min(16));
        let delay = self.base.saturating_mul(factor).min(self.cap);
        std::thread::sleep(delay);
    }
}

/// No pacing at all; for tests and embedded stores where conflicts resolve
/// immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

impl Backoff for NoPause {
    fn pause(&self, _attempt: u32) {}
}

/// Failure surfaced by cursor operations.
///
/// `Conflict` is a business-rule rejection raised by an advance function and
/// is never retried. `Store` is a true I/O failure, distinct from version
/// conflicts, which are retried internally and never surfaced. `Payload`
/// means a stored value did not decode as a position.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("conflicting cursor state: {reason}")]
    Conflict { reason: String },
    #[error("coordination store failure: {0}")]
    Store(#[from] StoreError),
    #[error("undecodable cursor payload")]
    Payload(#[from] ParseError),
}

/// Result of a successful monotonic advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The cursor moved to the candidate position.
    Advanced(ContentPath),
    /// The candidate did not exceed the stored position; nothing was written.
    Unchanged(ContentPath),
    /// No cursor existed; one was created from `advance(None)`.
    Created(ContentPath),
}

impl AdvanceOutcome {
    /// Position the cursor holds after the call, as far as this node saw.
    pub fn position(&self) -> &ContentPath {
        match self {
            AdvanceOutcome::Advanced(path)
            | AdvanceOutcome::Unchanged(path)
            | AdvanceOutcome::Created(path) => path,
        }
    }
}

struct Current {
    value: ContentPath,
    version: u64,
}

/// Per-channel "last processed position" pointer shared by every node in the
/// cluster, backed by the coordination store.
///
/// One record exists per `(name, namespace)`. [`CursorTracker::update_increase`]
/// is the monotonic-advance primitive: many leaderless writers may call it
/// concurrently and the stored value never regresses, enforced entirely by
/// version-checked conditional writes. [`CursorTracker::update`] is
/// last-write-wins and requires the caller to hold exclusive access; invoking
/// it concurrently with `update_increase` on the same cursor is a caller
/// defect. Read paths favor availability: a failing store degrades to the
/// caller-supplied default rather than an error. Nothing is cached; every
/// operation re-reads the store.
pub struct CursorTracker<S, B = CappedExponential> {
    store: S,
    backoff: B,
}

impl<S: CoordinationStore> CursorTracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            backoff: CappedExponential::default(),
        }
    }
}

impl<S: CoordinationStore, B: Backoff> CursorTracker<S, B> {
    pub fn with_backoff(store: S, backoff: B) -> Self {
        Self { store, backoff }
    }

    /// Creates the backing record if absent. "Already exists" is the expected
    /// outcome on every node but the first and is treated as success; other
    /// failures are logged and swallowed.
    pub fn initialize(&self, name: &str, default: &ContentPath, namespace: &str) {
        let path = node_path(namespace, name);
        match self.store.create(&path, &default.to_bytes()) {
            Ok(()) => trace!(name, namespace, %default, "initialized cursor"),
            Err(StoreError::NodeExists { .. }) => {
                trace!(name, namespace, "cursor already initialized");
            }
            Err(err) => warn!(name, namespace, error = %err, "unable to create cursor node"),
        }
    }

    /// Reads the cursor. A missing record is initialized with `default` and
    /// read once more; any other failure returns `default`, so callers must
    /// tolerate a stale or default result.
    pub fn get(&self, name: &str, default: &ContentPath, namespace: &str) -> ContentPath {
        let path = node_path(namespace, name);
        for attempt in 0..2 {
            match self.read_current(&path) {
                Ok(current) => return current.value,
                Err(CursorError::Store(StoreError::NoNode { .. })) if attempt == 0 => {
                    warn!(name, namespace, "missing cursor value, initializing");
                    self.initialize(name, default, namespace);
                }
                Err(err) => {
                    info!(name, namespace, error = %err, "unable to read cursor");
                    break;
                }
            }
        }
        default.clone()
    }

    /// Reads the cursor, returning `None` on any failure, for callers with
    /// their own recovery policy.
    pub fn get_or_none(&self, name: &str, namespace: &str) -> Option<ContentPath> {
        let path = node_path(namespace, name);
        match self.read_current(&path) {
            Ok(current) => Some(current.value),
            Err(err) => {
                info!(name, namespace, error = %err, "unable to read cursor");
                None
            }
        }
    }

    /// Unconditionally sets the cursor to `next`, creating the record if
    /// absent. Last-write-wins under concurrent callers: only use where the
    /// caller already holds exclusive access. Best-effort: failures are
    /// logged and swallowed.
    pub fn update(&self, next: &ContentPath, name: &str, namespace: &str) {
        let path = node_path(namespace, name);
        match self.read_current(&path) {
            Ok(current) => match self.store.compare_and_set(&path, &next.to_bytes(), current.version) {
                Ok(()) => trace!(name, namespace, %next, "updated cursor"),
                Err(err) => warn!(name, namespace, %next, error = %err, "unable to set cursor"),
            },
            Err(CursorError::Store(StoreError::NoNode { .. })) => {
                info!(name, namespace, "cursor does not exist, creating");
                self.initialize(name, next, namespace);
            }
            Err(err) => warn!(name, namespace, %next, error = %err, "unable to set cursor"),
        }
    }

    /// Advances the cursor monotonically.
    ///
    /// Loops: read `(current, version)`, compute `advance(Some(current))`,
    /// and conditionally write at that version. A version conflict means a
    /// concurrent writer advanced first; the cycle restarts from a fresh
    /// read, paced by the backoff policy, with no retry cap. A candidate
    /// that does not exceed the stored value writes nothing and still
    /// succeeds; the cursor never regresses. A missing record is created
    /// from `advance(None)` without entering the retry loop, unless another
    /// writer wins the creation race, in which case the loop continues
    /// against the record that now exists. Errors returned by `advance` are
    /// business-rule conflicts: they abort immediately and are never retried.
    pub fn update_increase<F>(
        &self,
        name: &str,
        namespace: &str,
        mut advance: F,
    ) -> Result<AdvanceOutcome, CursorError>
    where
        F: FnMut(Option<&ContentPath>) -> Result<ContentPath, CursorError>,
    {
        let path = node_path(namespace, name);
        let mut attempt = 0_u32;
        loop {
            let current = match self.read_current(&path) {
                Ok(current) => current,
                Err(CursorError::Store(StoreError::NoNode { .. })) => {
                    let first = advance(None)?;
                    match self.store.create(&path, &first.to_bytes()) {
                        Ok(()) => {
                            info!(name, namespace, %first, "created cursor");
                            return Ok(AdvanceOutcome::Created(first));
                        }
                        Err(StoreError::NodeExists { .. }) => {
                            trace!(name, namespace, "lost cursor creation race");
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) => return Err(err),
            };
            let candidate = advance(Some(&current.value))?;
            if candidate <= current.value {
                trace!(name, namespace, %candidate, current = %current.value, "candidate not greater");
                return Ok(AdvanceOutcome::Unchanged(current.value));
            }
            match self
                .store
                .compare_and_set(&path, &candidate.to_bytes(), current.version)
            {
                Ok(()) => {
                    trace!(name, namespace, %candidate, "advanced cursor");
                    return Ok(AdvanceOutcome::Advanced(candidate));
                }
                Err(StoreError::BadVersion { .. }) => {
                    debug!(name, namespace, attempt, "version conflict, retrying");
                    self.backoff.pause(attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Value form of [`CursorTracker::update_increase`].
    pub fn update_increase_to(
        &self,
        next: &ContentPath,
        name: &str,
        namespace: &str,
    ) -> Result<AdvanceOutcome, CursorError> {
        self.update_increase(name, namespace, |_| Ok(*next))
    }

    /// Removes the cursor. Absence is not an error; other failures are
    /// logged and swallowed.
    pub fn delete(&self, name: &str, namespace: &str) {
        let path = node_path(namespace, name);
        info!(name, namespace, "deleting cursor");
        match self.store.delete(&path) {
            Ok(()) => {}
            Err(StoreError::NoNode { .. }) => info!(name, namespace, "no cursor to delete"),
            Err(err) => warn!(name, namespace, error = %err, "unable to delete cursor"),
        }
    }

    /// Names tracked under `namespace`. Enumeration is best-effort: any
    /// failure yields an empty list.
    pub fn get_names(&self, namespace: &str) -> Vec<String> {
        match self.store.list_children(namespace) {
            Ok(names) => names,
            Err(err) => {
                warn!(namespace, error = %err, "unable to list cursors");
                Vec::new()
            }
        }
    }

    /// Deletes every cursor under `namespace` whose channel no longer exists
    /// in the directory, returning the removed names.
    pub fn prune_orphaned(
        &self,
        namespace: &str,
        directory: &impl ChannelDirectory,
    ) -> Vec<String> {
        let live: BTreeSet<String> = directory
            .channels()
            .into_iter()
            .map(|channel| channel.name)
            .collect();
        let mut removed = Vec::new();
        for name in self.get_names(namespace) {
            if !live.contains(&name) {
                info!(name, namespace, "removing cursor without channel");
                self.delete(&name, namespace);
                removed.push(name);
            }
        }
        removed
    }

    fn read_current(&self, path: &str) -> Result<Current, CursorError> {
        let versioned = self.store.read(path)?;
        let value = ContentPath::from_bytes(&versioned.bytes)?;
        Ok(Current {
            value,
            version: versioned.version,
        })
    }
}

fn node_path(namespace: &str, name: &str) -> String {
    format!("{namespace}{name}")
}
