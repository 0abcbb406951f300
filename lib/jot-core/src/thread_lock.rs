use crate::dispatcher::{DispatchError, Dispatcher};
use std::cell::RefCell;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Shares UI-thread-only state with other threads by routing every access through the
/// dispatcher.
pub struct MainThreadLock<T: 'static> {
    /// # Safety
    /// We are using RefCell instead of Mutex because we know that we will only ever access it
    /// from the UI thread. We are wrapping T in Option<T> so that we can take it out and
    /// make sure it is dropped on the UI thread.
    inner: Arc<RefCell<Option<T>>>,
    thread_id: ThreadId,
    dispatcher: Dispatcher,
}

/// # Safety
/// This is safe because the inner value is only accessed on the UI thread.
/// So we can mark this as `Send` and `Sync` even if the inner value is not.
unsafe impl<T> Send for MainThreadLock<T> {}
unsafe impl<T> Sync for MainThreadLock<T> {}

impl<T> Clone for MainThreadLock<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            thread_id: self.thread_id,
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T> MainThreadLock<T> {
    /// Must be called on the UI thread.
    pub fn new(value: T, dispatcher: Dispatcher) -> Result<Self, DispatchError> {
        dispatcher.assert_ui_thread("MainThreadLock::new")?;

        Ok(Self {
            inner: Arc::new(RefCell::new(Some(value))),
            thread_id: thread::current().id(),
            dispatcher,
        })
    }

    fn on_owner_thread(&self) -> bool {
        self.thread_id == thread::current().id()
    }

    /// Runs `f` against the value without waiting for it. Runs inline when called on the UI
    /// thread outside of another access, otherwise queues behind work already scheduled.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        if self.on_owner_thread() {
            if let Ok(mut guard) = self.inner.try_borrow_mut() {
                if let Some(value) = guard.as_mut() {
                    f(value);
                }
                return;
            }
        }

        let lock = self.clone();
        self.dispatcher.post(move || lock.post(f));
    }

    /// Runs `f` against the value on the UI thread and waits for the result.
    pub fn access_blocking<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.on_owner_thread() {
            return self.with_mut(f);
        }

        let lock = self.clone();
        self.dispatcher
            .run_on_ui_thread_blocking(move || lock.with_mut(f))
            .and_then(|result| result)
    }

    /// Direct access for code that already runs on the UI thread, such as event loop
    /// handlers. No `Send` bound on `f`.
    pub fn with_mut<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut T) -> R,
    {
        if !self.on_owner_thread() {
            self.dispatcher.assert_ui_thread("MainThreadLock::with_mut")?;
        }

        let mut guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| DispatchError::Reentrant)?;
        let value = guard.as_mut().ok_or(DispatchError::Cancelled)?;
        Ok(f(value))
    }
}

struct UiOwned<T>(Arc<RefCell<Option<T>>>);

/// # Safety
/// Only moved to the UI thread, where it is released.
unsafe impl<T> Send for UiOwned<T> {}

impl<T> UiOwned<T> {
    fn release(self) {
        self.0.borrow_mut().take();
    }
}

/// # Safety
/// This ensures that T is always dropped on the UI thread.
impl<T> Drop for MainThreadLock<T> {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 && !self.on_owner_thread() {
            let owned = UiOwned(self.inner.clone());
            self.dispatcher.post(move || owned.release());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ManualExecutor;

    #[test]
    fn test_post_inline_on_ui_thread() {
        let executor = ManualExecutor::new();
        let lock = MainThreadLock::new(0u32, executor.dispatcher()).unwrap();

        lock.post(|value| *value += 1);

        assert_eq!(executor.pending(), 0);
        assert_eq!(lock.with_mut(|value| *value).unwrap(), 1);
    }

    #[test]
    fn test_reentrant_post_is_queued() {
        let executor = ManualExecutor::new();
        let lock = MainThreadLock::new(Vec::<u32>::new(), executor.dispatcher()).unwrap();

        let inner = lock.clone();
        lock.with_mut(|values| {
            values.push(1);
            inner.post(|values| values.push(2));
            values.push(3);
        })
        .unwrap();

        assert_eq!(executor.run_pending(), 1);
        assert_eq!(lock.with_mut(|values| values.clone()).unwrap(), vec![1, 3, 2]);
    }

    #[test]
    fn test_access_blocking_from_other_thread() {
        let executor = ManualExecutor::new();
        let lock = MainThreadLock::new(String::from("jot"), executor.dispatcher()).unwrap();

        let remote = lock.clone();
        let handle = thread::spawn(move || remote.access_blocking(|value| value.len()));

        while executor.pending() == 0 {
            thread::yield_now();
        }
        executor.run_pending();

        assert_eq!(handle.join().unwrap().unwrap(), 3);
    }

    #[test]
    fn test_with_mut_reentrant_fails() {
        let executor = ManualExecutor::new();
        let lock = MainThreadLock::new(0u32, executor.dispatcher()).unwrap();

        let inner = lock.clone();
        let result = lock
            .with_mut(|_| inner.with_mut(|value| *value))
            .unwrap();

        assert!(matches!(result, Err(DispatchError::Reentrant)));
    }
}
