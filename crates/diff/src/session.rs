//! A diff between two live documents.
//!
//! Edits are rebased onto the last diff right away, so callers always have
//! something close to current to show. A background worker recomputes the
//! full diff once the documents have been quiet for the debounce period.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::algorithms::{CancellationToken, Timeout};
use crate::computer::{DiffOptions, LinesDiffComputer};
use crate::document::DiffDocument;
use crate::line_edit::TextEdit;
use crate::range_mapping::LinesDiff;
use crate::rebase::{rebase_on_modified_edit, rebase_on_original_edit};

/// Tunables of a [`DiffSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long both documents have to be quiet before a full recompute.
    pub debounce: Duration,
    pub options: DiffOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            options: DiffOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Recomputing,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Original,
    Modified,
}

#[derive(Debug, Clone)]
struct PendingEdit {
    side: Side,
    edit: TextEdit,
}

enum Event {
    Edited,
    Dispose,
}

struct Inner {
    last_diff: Option<LinesDiff>,
    /// Whether `last_diff` still describes the documents exactly, up to the
    /// edits it was rebased over.
    rebaseable: bool,
    is_up_to_date: bool,
    state: SessionState,
    generation: u64,
    /// Edits notified since the running computation took its snapshot.
    pending_edits: Vec<PendingEdit>,
    token: Option<CancellationToken>,
}

struct Shared {
    original: Arc<dyn DiffDocument>,
    modified: Arc<dyn DiffDocument>,
    computer: LinesDiffComputer,
    options: DiffOptions,
    inner: Mutex<Inner>,
    changed: Condvar,
}

/// The inputs of one full recompute.
struct Job {
    generation: u64,
    token: CancellationToken,
    original: Vec<String>,
    modified: Vec<String>,
}

/// Keeps the diff of two documents up to date while they are edited.
///
/// The owner applies each edit to its document and then reports it with
/// [`DiffSession::notify_original_edit`] or
/// [`DiffSession::notify_modified_edit`].
///
/// An edit does not cancel a running computation by itself. The running
/// computation is cancelled only when the debounce period after the last
/// edit has passed and the next one starts. Until then it may finish, and
/// its result is installed after being rebased over the edits notified
/// while it ran. If that rebase fails the result is dropped and the next
/// computation replaces it.
pub struct DiffSession {
    shared: Arc<Shared>,
    events: mpsc::Sender<Event>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DiffSession {
    /// Start a session. The first diff is computed right away.
    pub fn new(
        original: Arc<dyn DiffDocument>,
        modified: Arc<dyn DiffDocument>,
        config: SessionConfig,
        computer: LinesDiffComputer,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            original,
            modified,
            computer,
            options: config.options,
            inner: Mutex::new(Inner {
                last_diff: None,
                rebaseable: false,
                is_up_to_date: false,
                state: SessionState::Idle,
                generation: 0,
                pending_edits: Vec::new(),
                token: None,
            }),
            changed: Condvar::new(),
        });

        let (events, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("diff-session".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_worker(shared, receiver, config.debounce)
            })
            .context("Failed to spawn the diff session worker")?;

        info!("diff session started with a debounce of {:?}", config.debounce);
        Ok(Self {
            shared,
            events,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Report an edit that has already been applied to the original document.
    pub fn notify_original_edit(&self, edit: &TextEdit) {
        self.notify_edit(Side::Original, edit);
    }

    /// Report an edit that has already been applied to the modified document.
    pub fn notify_modified_edit(&self, edit: &TextEdit) {
        self.notify_edit(Side::Modified, edit);
    }

    fn notify_edit(&self, side: Side, edit: &TextEdit) {
        {
            let mut inner = self.shared.lock();
            if inner.state == SessionState::Disposed {
                return;
            }

            if inner.rebaseable {
                if let Some(diff) = &inner.last_diff {
                    let original: &dyn DiffDocument = &*self.shared.original;
                    let modified: &dyn DiffDocument = &*self.shared.modified;
                    let rebased = match side {
                        Side::Original => rebase_on_original_edit(diff, edit, original, modified),
                        Side::Modified => rebase_on_modified_edit(diff, edit, original, modified),
                    };
                    match rebased {
                        Some(diff) => inner.last_diff = Some(diff),
                        None => {
                            debug!("edit of the {side:?} document could not be rebased, waiting for a recompute");
                            inner.rebaseable = false;
                        }
                    }
                }
            }

            inner.is_up_to_date = false;
            if inner.state == SessionState::Recomputing {
                inner.pending_edits.push(PendingEdit {
                    side,
                    edit: edit.clone(),
                });
            }
        }
        self.shared.changed.notify_all();
        // The worker only goes away on dispose.
        let _ = self.events.send(Event::Edited);
    }

    /// The latest diff, `None` until the first computation has finished.
    pub fn diff(&self) -> Option<LinesDiff> {
        self.shared.lock().last_diff.clone()
    }

    /// Whether [`Self::diff`] is the result of a full computation over the
    /// current documents.
    pub fn is_up_to_date(&self) -> bool {
        self.shared.lock().is_up_to_date
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Block until the diff is up to date, the session is disposed or
    /// `timeout` has passed. Returns whether the diff is up to date.
    pub fn wait_until_up_to_date(&self, timeout: Duration) -> bool {
        let inner = self.shared.lock();
        let (inner, _) = self
            .shared
            .changed
            .wait_timeout_while(inner, timeout, |inner| {
                !inner.is_up_to_date && inner.state != SessionState::Disposed
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.is_up_to_date
    }

    /// Cancel any running computation and stop the worker. Later
    /// notifications are ignored.
    pub fn dispose(&self) {
        {
            let mut inner = self.shared.lock();
            if inner.state == SessionState::Disposed {
                return;
            }
            inner.state = SessionState::Disposed;
            if let Some(token) = inner.token.take() {
                token.cancel();
            }
        }
        self.shared.changed.notify_all();
        let _ = self.events.send(Event::Dispose);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("diff session worker panicked");
            }
        }
        info!("diff session disposed");
    }
}

impl Drop for DiffSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_running(&self) {
        if let Some(token) = &self.lock().token {
            token.cancel();
        }
    }

    fn start_computation(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let job = {
            let mut inner = self.lock();
            if inner.state == SessionState::Disposed {
                return None;
            }
            if let Some(token) = inner.token.take() {
                token.cancel();
            }
            inner.generation += 1;
            let token = CancellationToken::new();
            inner.token = Some(token.clone());
            inner.pending_edits.clear();
            inner.state = SessionState::Recomputing;
            // Snapshot under the lock, so that every later notification is
            // recorded as pending.
            Job {
                generation: inner.generation,
                token,
                original: self.original.lines(),
                modified: self.modified.lines(),
            }
        };
        debug!("recomputing diff, generation {}", job.generation);

        let spawned = thread::Builder::new().name("diff-compute".into()).spawn({
            let shared = Arc::clone(self);
            move || {
                let started = Instant::now();
                let timeout =
                    Timeout::from_millis(shared.options.max_computation_time_ms).with_cancellation(job.token.clone());
                let diff = shared
                    .computer
                    .compute_diff_with_timeout(&job.original, &job.modified, &shared.options, &timeout);
                debug!("generation {} computed in {:?}", job.generation, started.elapsed());
                shared.finish_computation(job, diff);
            }
        });
        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("failed to spawn a diff computation: {err}");
                let mut inner = self.lock();
                if inner.state == SessionState::Recomputing {
                    inner.state = SessionState::Idle;
                }
                None
            }
        }
    }

    fn finish_computation(&self, job: Job, diff: LinesDiff) {
        let mut inner = self.lock();
        let current = inner.generation == job.generation;
        if current && inner.state == SessionState::Recomputing {
            inner.state = SessionState::Idle;
            inner.token = None;
        }

        if job.token.is_cancelled()
            || !current
            || inner.state == SessionState::Disposed
            || self.original.is_disposed()
            || self.modified.is_disposed()
        {
            debug!("discarding the diff of generation {}", job.generation);
            drop(inner);
            self.changed.notify_all();
            return;
        }

        let pending = std::mem::take(&mut inner.pending_edits);
        match self.rebase_over_pending(diff, job, &pending) {
            Some(diff) => {
                inner.last_diff = Some(diff);
                inner.rebaseable = true;
                inner.is_up_to_date = pending.is_empty();
            }
            None => debug!("discarding a diff that could not be rebased over {} edits", pending.len()),
        }
        drop(inner);
        self.changed.notify_all();
    }

    /// Bring a diff of the job's snapshot up to the current documents.
    fn rebase_over_pending(&self, diff: LinesDiff, job: Job, pending: &[PendingEdit]) -> Option<LinesDiff> {
        let Job {
            mut original,
            mut modified,
            ..
        } = job;
        let mut diff = diff;
        for PendingEdit { side, edit } in pending {
            diff = match side {
                Side::Original => {
                    original = edit.apply(&original);
                    rebase_on_original_edit(&diff, edit, &original, &modified)?
                }
                Side::Modified => {
                    modified = edit.apply(&modified);
                    rebase_on_modified_edit(&diff, edit, &original, &modified)?
                }
            };
        }
        // An edit applied to a document but not notified yet.
        if original != self.original.lines() || modified != self.modified.lines() {
            return None;
        }
        Some(diff)
    }
}

fn run_worker(shared: Arc<Shared>, events: mpsc::Receiver<Event>, debounce: Duration) {
    let mut computation = shared.start_computation();
    'events: loop {
        match events.recv() {
            Ok(Event::Edited) => {}
            Ok(Event::Dispose) | Err(_) => break,
        }
        loop {
            match events.recv_timeout(debounce) {
                Ok(Event::Edited) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Ok(Event::Dispose) | Err(RecvTimeoutError::Disconnected) => break 'events,
            }
        }
        if let Some(previous) = computation.take() {
            shared.cancel_running();
            join_computation(previous);
        }
        computation = shared.start_computation();
    }

    shared.cancel_running();
    if let Some(previous) = computation {
        join_computation(previous);
    }
}

fn join_computation(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("diff computation panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::compute_diff;
    use crate::document::RopeDocument;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    const WAIT: Duration = Duration::from_secs(10);

    fn session(original: &Arc<RopeDocument>, modified: &Arc<RopeDocument>) -> DiffSession {
        let config = SessionConfig::default().debounce(Duration::from_millis(10));
        DiffSession::new(
            original.clone(),
            modified.clone(),
            config,
            LinesDiffComputer::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_diff_is_computed() {
        let original = Arc::new(RopeDocument::from_str("a\nb\nc"));
        let modified = Arc::new(RopeDocument::from_str("a\nx\nc"));
        let session = session(&original, &modified);

        assert!(session.wait_until_up_to_date(WAIT));
        assert_eq!(session.state(), SessionState::Idle);
        let diff = session.diff().unwrap();
        assert_eq!(
            diff.changes,
            compute_diff(&original.lines(), &modified.lines(), &DiffOptions::default()).changes
        );
    }

    #[test]
    fn test_edit_is_rebased_before_the_recompute() {
        let original = Arc::new(RopeDocument::from_str("a\nb\nc\nd"));
        let modified = Arc::new(RopeDocument::from_str("a\nB\nc\nd"));
        let session = session(&original, &modified);
        assert!(session.wait_until_up_to_date(WAIT));

        let edit = TextEdit::insert(Position::new(4, 1), "x");
        modified.apply_edit(&edit).unwrap();
        session.notify_modified_edit(&edit);

        let expected = compute_diff(&original.lines(), &modified.lines(), &DiffOptions::default()).changes;
        assert_eq!(session.diff().unwrap().changes, expected);

        assert!(session.wait_until_up_to_date(WAIT));
        assert_eq!(session.diff().unwrap().changes, expected);
    }

    #[test]
    fn test_edits_touching_a_change_are_recomputed() {
        let original = Arc::new(RopeDocument::from_str("a\nb\nc"));
        let modified = Arc::new(RopeDocument::from_str("a\nB\nc"));
        let session = session(&original, &modified);
        assert!(session.wait_until_up_to_date(WAIT));

        let edit = TextEdit::insert(Position::new(2, 1), "b");
        original.apply_edit(&edit).unwrap();
        session.notify_original_edit(&edit);
        assert!(!session.is_up_to_date());

        assert!(session.wait_until_up_to_date(WAIT));
        let expected = compute_diff(&original.lines(), &modified.lines(), &DiffOptions::default()).changes;
        assert_eq!(session.diff().unwrap().changes, expected);
    }

    #[test]
    fn test_superseded_and_cancelled_results_are_discarded() {
        let original = Arc::new(RopeDocument::from_str("a\nb\nc"));
        let modified = Arc::new(RopeDocument::from_str("a\nx\nc"));
        let session = session(&original, &modified);
        assert!(session.wait_until_up_to_date(WAIT));
        let installed = session.diff();
        let generation = session.shared.lock().generation;

        let job = |generation: u64, token: CancellationToken| Job {
            generation,
            token,
            original: original.lines(),
            modified: modified.lines(),
        };
        let other = LinesDiff::new(Vec::new(), Vec::new(), true, false);

        session
            .shared
            .finish_computation(job(generation - 1, CancellationToken::new()), other.clone());
        assert_eq!(session.diff(), installed);

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        session.shared.finish_computation(job(generation, cancelled), other.clone());
        assert_eq!(session.diff(), installed);

        session
            .shared
            .finish_computation(job(generation, CancellationToken::new()), other.clone());
        assert_eq!(session.diff(), Some(other));
    }

    #[test]
    fn test_disposed_session_ignores_edits() {
        let original = Arc::new(RopeDocument::from_str("a"));
        let modified = Arc::new(RopeDocument::from_str("b"));
        let session = session(&original, &modified);
        session.dispose();

        assert_eq!(session.state(), SessionState::Disposed);
        let before = session.diff();
        let edit = TextEdit::insert(Position::new(1, 1), "x");
        modified.apply_edit(&edit).unwrap();
        session.notify_modified_edit(&edit);
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(session.diff(), before);
    }

    #[test]
    fn test_result_for_a_disposed_document_is_dropped() {
        let original = Arc::new(RopeDocument::from_str("a"));
        let modified = Arc::new(RopeDocument::from_str("b"));
        modified.dispose();
        let session = session(&original, &modified);

        assert!(!session.wait_until_up_to_date(Duration::from_millis(200)));
        assert_eq!(session.diff(), None);
    }
}
