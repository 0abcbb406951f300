use crate::hotkey::HotkeyError;
use global_hotkey::hotkey::HotKey;
use global_hotkey::{Error as GlobalHotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

pub type HotkeyId = u32;

/// Called with the id of a pressed hotkey, on whatever thread the OS delivers it.
pub type TriggerFn = Arc<dyn Fn(HotkeyId) + Send + Sync>;

/// The OS-wide hotkey table.
pub trait HotkeyBackend {
    /// Checks that the accelerator parses, without registering anything.
    fn validate(&self, accelerator: &str) -> Result<(), HotkeyError>;

    /// The id `accelerator` registers under. Spellings of the same combination share an id.
    fn id_of(&self, accelerator: &str) -> Result<HotkeyId, HotkeyError>;

    fn register(&mut self, accelerator: &str) -> Result<HotkeyId, HotkeyError>;

    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError>;

    /// Installs the press handler. Replaces any previous one.
    fn set_trigger(&mut self, trigger: TriggerFn);
}

/// Registers accelerators with the OS through `global-hotkey`.
///
/// On macOS this must be created on the main thread.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    registered: HashMap<HotkeyId, HotKey>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(|e| HotkeyError::Os(e.to_string()))?;
        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }

    fn parse(accelerator: &str) -> Result<HotKey, HotkeyError> {
        HotKey::from_str(accelerator).map_err(|e| HotkeyError::InvalidAccelerator {
            accelerator: accelerator.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Checks an accelerator string without touching the OS.
pub fn validate_accelerator(accelerator: &str) -> Result<(), HotkeyError> {
    GlobalHotkeyBackend::parse(accelerator).map(|_| ())
}

fn accelerator_id(accelerator: &str) -> Result<HotkeyId, HotkeyError> {
    GlobalHotkeyBackend::parse(accelerator).map(|hotkey| hotkey.id())
}

fn map_error(accelerator: &str, error: GlobalHotkeyError) -> HotkeyError {
    match error {
        GlobalHotkeyError::AlreadyRegistered(_) => HotkeyError::AlreadyBound {
            accelerator: accelerator.to_string(),
        },
        GlobalHotkeyError::FailedToRegister(reason) => {
            // Windows and X11 report a combination owned by another process this way.
            debug!("System rejected '{accelerator}': {reason}");
            HotkeyError::AlreadyBound {
                accelerator: accelerator.to_string(),
            }
        }
        other => HotkeyError::Os(other.to_string()),
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn validate(&self, accelerator: &str) -> Result<(), HotkeyError> {
        validate_accelerator(accelerator)
    }

    fn id_of(&self, accelerator: &str) -> Result<HotkeyId, HotkeyError> {
        accelerator_id(accelerator)
    }

    fn register(&mut self, accelerator: &str) -> Result<HotkeyId, HotkeyError> {
        let hotkey = Self::parse(accelerator)?;
        self.manager
            .register(hotkey)
            .map_err(|e| map_error(accelerator, e))?;

        let id = hotkey.id();
        self.registered.insert(id, hotkey);
        trace!("Registered '{accelerator}' as {id}");
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
        let hotkey = self.registered.remove(&id).ok_or(HotkeyError::NotBound)?;
        self.manager
            .unregister(hotkey)
            .map_err(|e| HotkeyError::Os(e.to_string()))
    }

    fn set_trigger(&mut self, trigger: TriggerFn) {
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state == HotKeyState::Pressed {
                trigger(event.id);
            }
        }));
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
        for (_, hotkey) in self.registered.drain() {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to release hotkey on shutdown: {e}");
            }
        }
    }
}

#[derive(Default)]
pub struct MockHotkeyState {
    /// Accelerators some other application holds.
    pub claimed_elsewhere: Vec<String>,
    pub registered: HashMap<HotkeyId, String>,
    pub register_calls: usize,
    pub unregister_calls: usize,
    /// Makes the next `register` of this accelerator fail as if the OS refused it.
    pub refuse_once: Option<String>,
    trigger: Option<TriggerFn>,
    ids: HashMap<String, HotkeyId>,
    next_id: HotkeyId,
}

impl MockHotkeyState {
    fn id_for(&mut self, accelerator: &str) -> HotkeyId {
        let key = mock_combination(accelerator);
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        self.next_id += 1;
        self.ids.insert(key, self.next_id);
        self.next_id
    }

    fn holds(&self, accelerator: &str) -> bool {
        let key = mock_combination(accelerator);
        self.claimed_elsewhere
            .iter()
            .chain(self.registered.values())
            .any(|a| mock_combination(a) == key)
    }
}

/// Canonical spelling for the mock: lowercase, common aliases folded, modifiers sorted, key
/// last.
fn mock_combination(accelerator: &str) -> String {
    let mut tokens: Vec<String> = accelerator
        .split('+')
        .map(|token| match token.trim().to_ascii_lowercase().as_str() {
            "option" => "alt".to_string(),
            "control" => "ctrl".to_string(),
            "commandorcontrol" | "cmdorcontrol" | "commandorctrl" => "cmdorctrl".to_string(),
            other => other.to_string(),
        })
        .collect();
    let key = tokens.pop();
    tokens.sort();
    tokens.extend(key);
    tokens.join("+")
}

/// In-memory hotkey table for tests. Cloning shares the table.
#[derive(Clone, Default)]
pub struct MockHotkeyBackend {
    state: Arc<Mutex<MockHotkeyState>>,
}

impl MockHotkeyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockHotkeyState> {
        self.state.lock().unwrap()
    }

    /// Pretends another application owns `accelerator`.
    pub fn claim_elsewhere(&self, accelerator: &str) {
        self.state().claimed_elsewhere.push(accelerator.to_string());
    }

    pub fn is_registered(&self, accelerator: &str) -> bool {
        let key = mock_combination(accelerator);
        self.state()
            .registered
            .values()
            .any(|registered| mock_combination(registered) == key)
    }

    /// Simulates the user pressing `accelerator`. Returns whether anything was registered
    /// for it. The trigger runs on the calling thread.
    pub fn press(&self, accelerator: &str) -> bool {
        let (id, trigger) = {
            let state = self.state();
            let key = mock_combination(accelerator);
            let id = state
                .registered
                .iter()
                .find(|(_, registered)| mock_combination(registered) == key)
                .map(|(id, _)| *id);
            (id, state.trigger.clone())
        };

        match (id, trigger) {
            (Some(id), Some(trigger)) => {
                trigger(id);
                true
            }
            _ => false,
        }
    }
}

impl HotkeyBackend for MockHotkeyBackend {
    fn validate(&self, accelerator: &str) -> Result<(), HotkeyError> {
        let valid = !accelerator.is_empty() && accelerator.split('+').all(|t| !t.trim().is_empty());
        if !valid {
            return Err(HotkeyError::InvalidAccelerator {
                accelerator: accelerator.to_string(),
                reason: "empty token".to_string(),
            });
        }
        Ok(())
    }

    fn id_of(&self, accelerator: &str) -> Result<HotkeyId, HotkeyError> {
        self.validate(accelerator)?;
        Ok(self.state().id_for(accelerator))
    }

    fn register(&mut self, accelerator: &str) -> Result<HotkeyId, HotkeyError> {
        self.validate(accelerator)?;

        let mut state = self.state();
        state.register_calls += 1;

        let refused = state.refuse_once.as_deref() == Some(accelerator);
        let taken = state.holds(accelerator);
        if refused {
            state.refuse_once = None;
        }
        if refused || taken {
            return Err(HotkeyError::AlreadyBound {
                accelerator: accelerator.to_string(),
            });
        }

        let id = state.id_for(accelerator);
        state.registered.insert(id, accelerator.to_string());
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
        let mut state = self.state();
        state.unregister_calls += 1;
        state.registered.remove(&id).ok_or(HotkeyError::NotBound)?;
        Ok(())
    }

    fn set_trigger(&mut self, trigger: TriggerFn) {
        self.state().trigger = Some(trigger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accelerator_parses() {
        assert!(validate_accelerator(crate::hotkey::DEFAULT_ACCELERATOR).is_ok());
        assert!(validate_accelerator("CmdOrCtrl+Alt+J").is_ok());
    }

    #[test]
    fn test_garbage_accelerator_is_invalid() {
        assert!(matches!(
            GlobalHotkeyBackend::parse("Shift+NotAKey"),
            Err(HotkeyError::InvalidAccelerator { .. })
        ));
    }

    #[test]
    fn test_already_registered_maps_to_already_bound() {
        let hotkey = HotKey::from_str("Shift+KeyJ").unwrap();
        assert_eq!(
            map_error("Shift+KeyJ", GlobalHotkeyError::AlreadyRegistered(hotkey)),
            HotkeyError::AlreadyBound {
                accelerator: "Shift+KeyJ".to_string()
            }
        );
    }

    #[test]
    fn test_aliases_share_an_id() {
        assert_eq!(
            accelerator_id("Alt+Shift+KeyJ").unwrap(),
            accelerator_id("Shift+Option+KeyJ").unwrap()
        );
        assert_ne!(
            accelerator_id("Alt+Shift+KeyJ").unwrap(),
            accelerator_id("Alt+KeyJ").unwrap()
        );
    }

    #[test]
    fn test_mock_folds_aliases() {
        let backend = MockHotkeyBackend::new();

        assert_eq!(
            backend.id_of("Alt+Shift+J").unwrap(),
            backend.id_of("shift+option+J").unwrap()
        );
        assert_ne!(backend.id_of("Alt+J").unwrap(), backend.id_of("Alt+K").unwrap());
    }

    #[test]
    fn test_mock_rejects_claimed_accelerator() {
        let mut backend = MockHotkeyBackend::new();
        backend.claim_elsewhere("Alt+Space");

        assert!(matches!(
            backend.register("Alt+Space"),
            Err(HotkeyError::AlreadyBound { .. })
        ));
        assert!(backend.register("Alt+J").is_ok());
        assert!(backend.is_registered("Alt+J"));
    }

    #[test]
    fn test_mock_refuse_once() {
        let mut backend = MockHotkeyBackend::new();
        backend.state().refuse_once = Some("Alt+J".to_string());

        assert!(backend.register("Alt+J").is_err());
        assert!(backend.register("Alt+J").is_ok());
    }
}
