//! Recording stand-ins for the native window and platform adapter. Used by the unit and
//! integration tests to drive the overlay without an OS window system.

use crate::platform::{
    Bounds, Display, ForegroundProcessHandle, OverlayWindow, PlatformAdapter, PlatformError,
    PlatformResult, PointerPosition, Position, WindowId,
};
use std::sync::{Arc, Mutex, MutexGuard};
use winit::raw_window_handle::RawWindowHandle;

#[derive(Debug)]
pub struct MockPlatformState {
    pub foreground: Option<ForegroundProcessHandle>,
    pub floating_supported: bool,
    pub reactivation_fails: bool,
    pub cursor: Option<PointerPosition>,
    pub captures: usize,
    pub make_floating_calls: usize,
    pub reveal_calls: usize,
    pub reactivated: Vec<ForegroundProcessHandle>,
}

impl Default for MockPlatformState {
    fn default() -> Self {
        Self {
            foreground: Some(ForegroundProcessHandle::new(4242, Some(7))),
            floating_supported: true,
            reactivation_fails: false,
            cursor: None,
            captures: 0,
            make_floating_calls: 0,
            reveal_calls: 0,
            reactivated: Vec::new(),
        }
    }
}

/// Cloning shares the recorded state, so a test can keep one copy while the controller owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockPlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockPlatformState> {
        self.state.lock().unwrap()
    }

    pub fn set_foreground(&self, foreground: Option<ForegroundProcessHandle>) {
        self.state().foreground = foreground;
    }

    /// Places the pointer in physical pixels.
    pub fn set_cursor(&self, cursor: Option<Position>) {
        self.state().cursor = cursor.map(PointerPosition::Physical);
    }

    /// Places the pointer in logical points, the way AppKit reports it.
    pub fn set_cursor_points(&self, cursor: Position) {
        self.state().cursor = Some(PointerPosition::Logical(cursor));
    }

    pub fn set_floating_supported(&self, supported: bool) {
        self.state().floating_supported = supported;
    }

    pub fn set_reactivation_fails(&self, fails: bool) {
        self.state().reactivation_fails = fails;
    }

    pub fn captures(&self) -> usize {
        self.state().captures
    }

    pub fn reactivated(&self) -> Vec<ForegroundProcessHandle> {
        self.state().reactivated.clone()
    }
}

impl PlatformAdapter for MockPlatform {
    fn make_floating(&self, _window: &dyn OverlayWindow) -> PlatformResult<()> {
        let mut state = self.state();
        state.make_floating_calls += 1;
        if !state.floating_supported {
            return Err(PlatformError::CapabilityUnavailable(
                "mock platform has no floating panels".to_string(),
            ));
        }
        return Ok(());
    }

    fn reveal(&self, window: &dyn OverlayWindow) -> PlatformResult<()> {
        self.state().reveal_calls += 1;
        window.set_visible(true);
        window.request_focus();
        return Ok(());
    }

    fn capture_foreground_process(&self) -> Option<ForegroundProcessHandle> {
        let mut state = self.state();
        state.captures += 1;
        return state.foreground.clone();
    }

    fn reactivate_process(&self, handle: &ForegroundProcessHandle) -> PlatformResult<()> {
        let mut state = self.state();
        if state.reactivation_fails {
            return Err(PlatformError::ReactivationFailed {
                pid: handle.pid,
                reason: "mock refused".to_string(),
            });
        }
        state.reactivated.push(handle.clone());
        return Ok(());
    }

    fn cursor_position(&self) -> Option<PointerPosition> {
        return self.state().cursor.clone();
    }
}

#[derive(Debug)]
pub struct MockWindowState {
    pub id: WindowId,
    pub visible: bool,
    pub always_on_top: bool,
    pub bounds: Option<Bounds>,
    pub displays: Vec<Display>,
    pub focus_requests: usize,
    pub visibility_changes: Vec<bool>,
    pub redraws: usize,
}

impl Default for MockWindowState {
    fn default() -> Self {
        Self {
            id: 1,
            visible: false,
            always_on_top: false,
            bounds: None,
            displays: vec![Display {
                id: 0,
                name: "Mock Display".to_string(),
                bounds: Bounds::new(0, 0, 1920, 1080),
                scale_factor: 1.0,
            }],
            focus_requests: 0,
            visibility_changes: Vec::new(),
            redraws: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockOverlayWindow {
    state: Arc<Mutex<MockWindowState>>,
}

impl MockOverlayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_displays(displays: Vec<Display>) -> Self {
        let window = Self::default();
        window.state().displays = displays;
        window
    }

    pub fn state(&self) -> MutexGuard<'_, MockWindowState> {
        self.state.lock().unwrap()
    }

    /// How many times the window went from hidden to visible.
    pub fn times_shown(&self) -> usize {
        self.state()
            .visibility_changes
            .iter()
            .filter(|visible| **visible)
            .count()
    }
}

impl OverlayWindow for MockOverlayWindow {
    fn id(&self) -> WindowId {
        return self.state().id;
    }

    fn raw_handle(&self) -> PlatformResult<RawWindowHandle> {
        return Err(PlatformError::WindowUnavailable(
            "mock window has no native handle".to_string(),
        ));
    }

    fn set_bounds(&self, bounds: &Bounds) -> PlatformResult<()> {
        self.state().bounds = Some(bounds.clone());
        return Ok(());
    }

    fn set_visible(&self, visible: bool) {
        let mut state = self.state();
        if state.visible != visible {
            state.visibility_changes.push(visible);
        }
        state.visible = visible;
    }

    fn is_visible(&self) -> bool {
        return self.state().visible;
    }

    fn request_focus(&self) {
        self.state().focus_requests += 1;
    }

    fn set_always_on_top(&self, always_on_top: bool) {
        self.state().always_on_top = always_on_top;
    }

    fn request_redraw(&self) {
        self.state().redraws += 1;
    }

    fn displays(&self) -> Vec<Display> {
        return self.state().displays.clone();
    }
}
