use log::{error, warn};
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use thiserror::Error;

pub type UiTask = Box<dyn FnOnce() + Send>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("The UI event loop is not running")]
    EventLoopClosed,
    #[error("The UI task was dropped before it completed")]
    Cancelled,
    #[error("The UI state is already borrowed by the running task")]
    Reentrant,
    #[error(transparent)]
    ThreadAffinity(#[from] ThreadAffinityViolation),
}

/// A native window call was attempted off the UI thread without going through the dispatcher.
/// This is a programming error.
#[derive(Debug, Error)]
#[error("{operation} must run on the UI thread")]
pub struct ThreadAffinityViolation {
    pub operation: &'static str,
}

/// Something that can run tasks on the thread owning the native UI toolkit.
pub trait UiExecutor: Send + Sync {
    fn ui_thread(&self) -> ThreadId;

    /// Queues a task for the next idle tick of the UI thread.
    fn post(&self, task: UiTask) -> Result<(), DispatchError>;
}

/// Funnels work onto the UI thread. Every window-mutating call goes through here.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn UiExecutor>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn UiExecutor>) -> Self {
        Self { executor }
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.executor.ui_thread()
    }

    /// Runs inline when already on the UI thread, otherwise queues the task. Fire and forget.
    pub fn run_on_ui_thread<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            f();
        } else {
            self.post(f);
        }
    }

    /// Always queues, even from the UI thread.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.executor.post(Box::new(f)) {
            warn!("Dropping UI task: {e}");
        }
    }

    /// Runs the task on the UI thread and waits for its result.
    ///
    /// Must not be called from a thread the UI thread is itself waiting on.
    pub fn run_on_ui_thread_blocking<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(f());
        }

        let (tx, rx) = mpsc::channel();
        self.executor.post(Box::new(move || {
            let _ = tx.send(f());
        }))?;

        rx.recv().map_err(|_| DispatchError::Cancelled)
    }

    /// Asserts in debug builds, logs and fails in release builds.
    pub fn assert_ui_thread(&self, operation: &'static str) -> Result<(), ThreadAffinityViolation> {
        if self.is_ui_thread() {
            return Ok(());
        }

        let violation = ThreadAffinityViolation { operation };
        debug_assert!(false, "{violation}");
        error!("{violation}");
        Err(violation)
    }
}

/// An executor whose queue is drained explicitly by calling [`ManualExecutor::run_pending`]
/// on the thread that created it. Used by tests and headless embeddings.
pub struct ManualExecutor {
    ui_thread: ThreadId,
    queue: Mutex<VecDeque<UiTask>>,
}

impl ManualExecutor {
    /// The calling thread becomes the UI thread.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ui_thread: thread::current().id(),
            queue: Mutex::new(VecDeque::new()),
        })
    }

    pub fn dispatcher(self: &Arc<Self>) -> Dispatcher {
        Dispatcher::new(self.clone())
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Runs queued tasks in order, including tasks queued by the tasks themselves. Returns how
    /// many ran.
    pub fn run_pending(&self) -> usize {
        assert_eq!(thread::current().id(), self.ui_thread);

        let mut ran = 0;
        loop {
            // The lock is released before the task runs so the task can queue more work.
            let task = match self.queue.lock() {
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

impl UiExecutor for ManualExecutor {
    fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    fn post(&self, task: UiTask) -> Result<(), DispatchError> {
        self.queue
            .lock()
            .map_err(|_| DispatchError::EventLoopClosed)?
            .push_back(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_inline_on_ui_thread() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        dispatcher.run_on_ui_thread(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_queues_from_other_thread() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();
        let order = Arc::new(Mutex::new(Vec::new()));

        let d = dispatcher.clone();
        let o = order.clone();
        thread::spawn(move || {
            assert!(!d.is_ui_thread());
            for i in 0..3 {
                let o = o.clone();
                d.run_on_ui_thread(move || o.lock().unwrap().push(i));
            }
        })
        .join()
        .unwrap();

        assert!(order.lock().unwrap().is_empty());
        assert_eq!(executor.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_blocking_round_trip() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();

        let handle = thread::spawn(move || dispatcher.run_on_ui_thread_blocking(|| 40 + 2));

        while executor.pending() == 0 {
            thread::yield_now();
        }
        executor.run_pending();

        assert_eq!(handle.join().unwrap().unwrap(), 42);
    }

    #[test]
    fn test_blocking_cancelled_when_task_dropped() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();
        let e = executor.clone();

        let handle = thread::spawn(move || dispatcher.run_on_ui_thread_blocking(|| 1));

        while e.pending() == 0 {
            thread::yield_now();
        }
        // Dropping the queued task drops the reply sender.
        e.queue.lock().unwrap().clear();

        assert!(matches!(
            handle.join().unwrap(),
            Err(DispatchError::Cancelled)
        ));
    }

    #[test]
    fn test_assert_ui_thread_passes_on_ui_thread() {
        let executor = ManualExecutor::new();
        assert!(executor.dispatcher().assert_ui_thread("test").is_ok());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_assert_ui_thread_fails_off_thread() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();
        let result = thread::spawn(move || dispatcher.assert_ui_thread("test").is_err())
            .join()
            .unwrap();
        assert!(result);
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_assert_ui_thread_panics_off_thread_in_debug() {
        let executor = ManualExecutor::new();
        let dispatcher = executor.dispatcher();
        let result = thread::spawn(move || dispatcher.assert_ui_thread("test")).join();
        assert!(result.is_err());
    }
}
