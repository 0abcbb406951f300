use crate::hotkey::{HotkeyBackend, HotkeyError, HotkeyId, TriggerFn};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};

/// The accelerator currently tied to the overlay toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShortcutBinding {
    pub accelerator: String,
    pub bound: bool,
}

/// Owns the single global shortcut that toggles the overlay.
///
/// Presses arrive on an OS thread and are forwarded to `on_trigger` untouched. The callback
/// must only hand work off (for example to the dispatcher), never touch window state.
pub struct HotkeyRegistrar<B: HotkeyBackend> {
    backend: B,
    binding: ShortcutBinding,
    active: Arc<Mutex<Option<HotkeyId>>>,
}

impl<B: HotkeyBackend> HotkeyRegistrar<B> {
    pub fn new<F>(mut backend: B, on_trigger: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let active: Arc<Mutex<Option<HotkeyId>>> = Arc::new(Mutex::new(None));

        let current = active.clone();
        let trigger: TriggerFn = Arc::new(move |id| {
            let matches = current.lock().map(|a| *a == Some(id)).unwrap_or(false);
            if matches {
                on_trigger();
            }
        });
        backend.set_trigger(trigger);

        Self {
            backend,
            binding: ShortcutBinding::default(),
            active,
        }
    }

    pub fn binding(&self) -> &ShortcutBinding {
        &self.binding
    }

    /// Binds `accelerator` to the toggle. If something is already bound it is released only
    /// after the new accelerator is registered, so a failure leaves the old binding working.
    pub fn bind(&mut self, accelerator: &str) -> Result<(), HotkeyError> {
        if self.is_bound_to(accelerator)? {
            if self.binding.accelerator != accelerator {
                debug!(
                    "'{accelerator}' is the bound shortcut {}",
                    self.binding.accelerator
                );
                self.binding.accelerator = accelerator.to_string();
            }
            return Ok(());
        }

        let id = self.backend.register(accelerator).inspect_err(|e| {
            warn!("Could not bind '{accelerator}': {e}");
        })?;

        let previous = self.swap_active(Some(id));
        if let Some(previous) = previous {
            if let Err(e) = self.backend.unregister(previous) {
                warn!("Failed to release '{}': {e}", self.binding.accelerator);
            }
        }

        self.binding = ShortcutBinding {
            accelerator: accelerator.to_string(),
            bound: true,
        };
        info!("Overlay shortcut bound to {accelerator}");
        Ok(())
    }

    /// Releases the current binding. A no-op when nothing is bound.
    pub fn unbind(&mut self) {
        let Some(id) = self.swap_active(None) else {
            return;
        };

        if let Err(e) = self.backend.unregister(id) {
            warn!("Failed to release '{}': {e}", self.binding.accelerator);
        }
        self.binding.bound = false;
        debug!("Overlay shortcut {} released", self.binding.accelerator);
    }

    /// Unbinds the current accelerator and binds `accelerator` in its place. If the new one is
    /// refused, the previous accelerator is bound again and the error is returned.
    pub fn rebind(&mut self, accelerator: &str) -> Result<(), HotkeyError> {
        self.backend.validate(accelerator)?;
        if self.is_bound_to(accelerator)? {
            return self.bind(accelerator);
        }

        let previous = self.binding.clone();
        self.unbind();

        let error = match self.bind(accelerator) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if previous.bound {
            match self.bind(&previous.accelerator) {
                Ok(()) => info!("Kept previous shortcut {}", previous.accelerator),
                Err(restore) => error!(
                    "Could not restore previous shortcut {}: {restore}",
                    previous.accelerator
                ),
            }
        }

        Err(error)
    }

    /// Whether `accelerator` names the combination registered right now.
    fn is_bound_to(&self, accelerator: &str) -> Result<bool, HotkeyError> {
        let active = match self.active.lock() {
            Ok(active) => *active,
            Err(poisoned) => *poisoned.into_inner(),
        };
        match active {
            Some(active) => Ok(self.backend.id_of(accelerator)? == active),
            None => Ok(false),
        }
    }

    fn swap_active(&self, id: Option<HotkeyId>) -> Option<HotkeyId> {
        match self.active.lock() {
            Ok(mut active) => std::mem::replace(&mut *active, id),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), id),
        }
    }
}

impl<B: HotkeyBackend> Drop for HotkeyRegistrar<B> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::MockHotkeyBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registrar() -> (
        HotkeyRegistrar<MockHotkeyBackend>,
        MockHotkeyBackend,
        Arc<AtomicUsize>,
    ) {
        let backend = MockHotkeyBackend::new();
        let presses = Arc::new(AtomicUsize::new(0));
        let counter = presses.clone();
        let registrar = HotkeyRegistrar::new(backend.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (registrar, backend, presses)
    }

    #[test]
    fn test_bind_and_press() {
        let (mut registrar, backend, presses) = registrar();

        registrar.bind("Alt+J").unwrap();
        assert!(backend.press("Alt+J"));

        assert_eq!(presses.load(Ordering::SeqCst), 1);
        assert_eq!(
            registrar.binding(),
            &ShortcutBinding {
                accelerator: "Alt+J".to_string(),
                bound: true
            }
        );
    }

    #[test]
    fn test_bind_collision_keeps_previous() {
        let (mut registrar, backend, presses) = registrar();
        backend.claim_elsewhere("Alt+Space");

        registrar.bind("Alt+J").unwrap();
        let result = registrar.bind("Alt+Space");

        assert!(matches!(result, Err(HotkeyError::AlreadyBound { .. })));
        assert_eq!(registrar.binding().accelerator, "Alt+J");
        assert!(!backend.press("Alt+Space"));
        assert!(backend.press("Alt+J"));
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bind_replaces_previous() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        registrar.bind("Alt+K").unwrap();

        assert!(!backend.is_registered("Alt+J"));
        assert!(backend.is_registered("Alt+K"));
        assert_eq!(backend.state().registered.len(), 1);
    }

    #[test]
    fn test_bind_same_accelerator_is_noop() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        registrar.bind("Alt+J").unwrap();

        assert_eq!(backend.state().register_calls, 1);
    }

    #[test]
    fn test_bind_alias_of_bound_accelerator() {
        let (mut registrar, backend, presses) = registrar();

        registrar.bind("Alt+Shift+J").unwrap();
        registrar.bind("shift+option+J").unwrap();

        assert_eq!(backend.state().register_calls, 1);
        assert_eq!(backend.state().unregister_calls, 0);
        assert_eq!(
            registrar.binding(),
            &ShortcutBinding {
                accelerator: "shift+option+J".to_string(),
                bound: true
            }
        );
        assert!(backend.press("Alt+Shift+J"));
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rebind_alias_keeps_registration() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+Shift+J").unwrap();
        registrar.rebind("Option+Shift+J").unwrap();

        assert_eq!(backend.state().register_calls, 1);
        assert_eq!(registrar.binding().accelerator, "Option+Shift+J");
        assert!(registrar.binding().bound);
    }

    #[test]
    fn test_stale_id_does_not_trigger() {
        let (mut registrar, backend, presses) = registrar();

        registrar.bind("Alt+J").unwrap();
        registrar.unbind();

        assert!(!backend.press("Alt+J"));
        assert_eq!(presses.load(Ordering::SeqCst), 0);
        assert!(!registrar.binding().bound);
    }

    #[test]
    fn test_unbind_twice_is_noop() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        registrar.unbind();
        registrar.unbind();

        assert_eq!(backend.state().unregister_calls, 1);
    }

    #[test]
    fn test_rebind_rolls_back_on_refusal() {
        let (mut registrar, backend, presses) = registrar();
        backend.claim_elsewhere("Alt+Space");

        registrar.bind("Alt+J").unwrap();
        let result = registrar.rebind("Alt+Space");

        assert!(matches!(result, Err(HotkeyError::AlreadyBound { .. })));
        assert!(backend.is_registered("Alt+J"));
        assert!(!backend.is_registered("Alt+Space"));
        assert_eq!(registrar.binding().accelerator, "Alt+J");
        assert!(registrar.binding().bound);

        assert!(backend.press("Alt+J"));
        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rebind_invalid_accelerator_touches_nothing() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        let result = registrar.rebind("Alt++");

        assert!(matches!(
            result,
            Err(HotkeyError::InvalidAccelerator { .. })
        ));
        assert_eq!(backend.state().unregister_calls, 0);
        assert!(backend.is_registered("Alt+J"));
    }

    #[test]
    fn test_rebind_success() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        registrar.rebind("Alt+K").unwrap();

        assert!(!backend.is_registered("Alt+J"));
        assert!(backend.is_registered("Alt+K"));
    }

    #[test]
    fn test_rebind_from_unbound() {
        let (mut registrar, backend, _) = registrar();
        backend.claim_elsewhere("Alt+Space");

        assert!(registrar.rebind("Alt+Space").is_err());
        assert!(!registrar.binding().bound);
        assert!(backend.state().registered.is_empty());
    }

    #[test]
    fn test_drop_unbinds() {
        let (mut registrar, backend, _) = registrar();

        registrar.bind("Alt+J").unwrap();
        drop(registrar);

        assert!(backend.state().registered.is_empty());
    }
}
