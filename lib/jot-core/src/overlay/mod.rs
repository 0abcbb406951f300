pub mod controller;
pub mod position;
pub mod render;
pub mod shell;
pub mod tracker;
pub mod view;
pub mod window;

pub use controller::{DismissReason, OverlayController, OverlayError, OverlayState};
pub use position::OverlayPosition;
pub use shell::OverlayShell;
pub use tracker::ForegroundTracker;
pub use view::{EntryAction, EntryKey, EntryView};
pub use window::WinitOverlayWindow;

use crate::dispatcher::DispatchError;
use crate::platform::{OverlayWindow, PlatformAdapter};
use crate::thread_lock::MainThreadLock;

/// Entry points for the rest of the application. Safe to call from any thread; every call is
/// marshalled onto the UI thread and calls made from one thread run in order.
pub struct OverlayHandle<W: OverlayWindow + 'static, P: PlatformAdapter + 'static> {
    shell: MainThreadLock<OverlayShell<W, P>>,
}

impl<W: OverlayWindow + 'static, P: PlatformAdapter + 'static> Clone for OverlayHandle<W, P> {
    fn clone(&self) -> Self {
        Self {
            shell: self.shell.clone(),
        }
    }
}

impl<W: OverlayWindow + 'static, P: PlatformAdapter + 'static> OverlayHandle<W, P> {
    pub fn new(shell: MainThreadLock<OverlayShell<W, P>>) -> Self {
        Self { shell }
    }

    pub fn show(&self) {
        self.shell.post(|shell| shell.show());
    }

    pub fn hide(&self) {
        self.shell.post(|shell| shell.hide());
    }

    pub fn toggle(&self) {
        self.shell.post(|shell| shell.toggle());
    }

    /// Returns the state once everything queued before this call has run.
    pub fn state(&self) -> Result<OverlayState, DispatchError> {
        self.shell.access_blocking(|shell| shell.state())
    }

    pub fn shell(&self) -> &MainThreadLock<OverlayShell<W, P>> {
        &self.shell
    }
}
