//! One background thread per overlay.
//!
//! Requests go through an unbounded channel; the thread always works on
//! the newest one and drops anything queued behind it. A finished, valid
//! result waits in a pending slot until the render thread calls
//! [`OverlayWorker::poll`], which makes it current and hands the previous
//! buffers back to the worker for reuse.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use grid_processor::{QueryOutcome, QueryParams};
use terrain_common::CancelToken;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::{OverlayError, Result};

/// Work an [`OverlayWorker`] runs for each request.
pub trait OverlayTask: Send + 'static {
    type Request: Clone + Send + 'static;

    /// Fill `output` for `request`. `output.cancel` is the request's token.
    ///
    /// The result is published only when this returns
    /// [`QueryOutcome::Complete`] with `output.valid` set.
    fn execute(&mut self, request: &Self::Request, output: &mut QueryParams) -> Result<QueryOutcome>;
}

struct Submission<R> {
    request: R,
    cancel: CancelToken,
}

#[derive(Default)]
struct Slots {
    /// Completed result not yet picked up by `poll`.
    pending: Option<QueryParams>,
    /// Buffers handed back for the next query.
    spare: Option<QueryParams>,
    /// Token of the newest submitted request.
    active: Option<CancelToken>,
}

#[derive(Default)]
struct Shared {
    slots: Mutex<Slots>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_spare(&self) -> QueryParams {
        self.lock().spare.take().unwrap_or_default()
    }

    fn recycle(&self, buffers: QueryParams) {
        self.lock().spare.get_or_insert(buffers);
    }

    fn publish(&self, result: QueryParams) {
        let mut slots = self.lock();
        // An unpolled older result is superseded.
        if let Some(stale) = slots.pending.replace(result) {
            slots.spare.get_or_insert(stale);
        }
    }
}

/// Owns the worker thread for one overlay and its published result.
pub struct OverlayWorker<T: OverlayTask> {
    tx: Option<UnboundedSender<Submission<T::Request>>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    current: Option<QueryParams>,
}

impl<T: OverlayTask> OverlayWorker<T> {
    /// Start a worker thread named `name` running `task`.
    pub fn spawn(name: impl Into<String>, task: T) -> std::io::Result<Self> {
        let name = name.into();
        let (tx, rx) = unbounded_channel();
        let shared = Arc::new(Shared::default());

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(task, rx, thread_shared))?;

        info!(worker = %name, "Overlay worker started");

        Ok(Self {
            tx: Some(tx),
            shared,
            handle: Some(handle),
            current: None,
        })
    }

    /// Queue a request, canceling whatever the worker is doing.
    pub fn submit(&self, request: T::Request) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(OverlayError::WorkerGone)?;
        let cancel = CancelToken::new();

        {
            let mut slots = self.shared.lock();
            if let Some(previous) = slots.active.replace(cancel.clone()) {
                previous.cancel();
            }
        }

        tx.send(Submission { request, cancel })
            .map_err(|_| OverlayError::WorkerGone)
    }

    /// Cancel the outstanding request, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.shared.lock().active.take() {
            debug!("Requesting cancel on current query");
            token.cancel();
        }
    }

    /// Make a newly completed result current. Returns `true` when the
    /// current result changed.
    pub fn poll(&mut self) -> bool {
        let mut slots = self.shared.lock();
        let Some(result) = slots.pending.take() else {
            return false;
        };
        if let Some(previous) = self.current.replace(result) {
            slots.spare.get_or_insert(previous);
        }
        true
    }

    /// Latest published result.
    pub fn current(&self) -> Option<&QueryParams> {
        self.current.as_ref()
    }
}

impl<T: OverlayTask> Drop for OverlayWorker<T> {
    fn drop(&mut self) {
        self.cancel();
        // Closing the channel ends the worker loop.
        self.tx.take();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                error!("Overlay worker thread panicked: {:?}", e);
            } else {
                debug!("Overlay worker thread joined");
            }
        }
    }
}

fn run_worker<T: OverlayTask>(
    mut task: T,
    mut rx: UnboundedReceiver<Submission<T::Request>>,
    shared: Arc<Shared>,
) {
    let mut next = rx.blocking_recv();

    while let Some(mut submission) = next.take() {
        while let Ok(newer) = rx.try_recv() {
            submission = newer;
        }

        let mut output = shared.take_spare();
        output.cancel = submission.cancel.clone();

        match task.execute(&submission.request, &mut output) {
            Ok(QueryOutcome::Complete) if output.valid => {
                let refresh = output.needs_refresh;
                shared.publish(output);
                metrics::counter!("overlay_results_published_total").increment(1);

                // A quick pass for a freshly settled view is followed by the
                // full query for the same view.
                if refresh && !submission.cancel.is_canceled() {
                    next = Some(submission);
                    continue;
                }
            }
            Ok(QueryOutcome::Complete) => {
                debug!("Query produced no result to publish");
                shared.recycle(output);
            }
            Ok(QueryOutcome::Canceled) => {
                debug!("Query canceled");
                metrics::counter!("overlay_queries_canceled_total").increment(1);
                shared.recycle(output);
            }
            Err(e) => {
                warn!(error = %e, "Overlay query failed");
                shared.recycle(output);
            }
        }

        next = rx.blocking_recv();
    }

    info!("Overlay worker shutting down");
}
