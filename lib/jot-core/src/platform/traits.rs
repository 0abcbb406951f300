use crate::platform::{
    Bounds, Display, ForegroundProcessHandle, PlatformResult, PointerPosition, WindowId,
};
use winit::raw_window_handle::RawWindowHandle;

/// The native window the overlay is drawn in. Implementations are only touched from the UI
/// thread, so they do not need to be `Send`.
pub trait OverlayWindow {
    fn id(&self) -> WindowId;

    /// The raw native handle, used by the platform adapter to reach OS-specific window APIs.
    fn raw_handle(&self) -> PlatformResult<RawWindowHandle>;

    fn set_bounds(&self, bounds: &Bounds) -> PlatformResult<()>;
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
    fn request_focus(&self);
    fn set_always_on_top(&self, always_on_top: bool);
    fn request_redraw(&self);

    /// Returns every monitor currently connected to the system.
    fn displays(&self) -> Vec<Display>;
}

/// Per-OS window manager behaviour that portable window APIs cannot express.
pub trait PlatformAdapter
where
    Self: Sized,
{
    /// Converts the window into a floating, non-activating surface that renders above full
    /// screen applications and follows the user across virtual desktops. Must be idempotent.
    fn make_floating(&self, window: &dyn OverlayWindow) -> PlatformResult<()>;

    /// Orders the window in and gives it keyboard focus. Platforms that would switch virtual
    /// desktops on a plain activation override this.
    fn reveal(&self, window: &dyn OverlayWindow) -> PlatformResult<()> {
        window.set_visible(true);
        window.request_focus();
        Ok(())
    }

    /// Returns `None` when there is nothing worth reactivating later. Never an error.
    fn capture_foreground_process(&self) -> Option<ForegroundProcessHandle>;

    /// Best-effort. Callers log failures and move on.
    fn reactivate_process(&self, handle: &ForegroundProcessHandle) -> PlatformResult<()>;

    fn requires_main_thread_affinity(&self) -> bool {
        true
    }

    /// Global pointer position, if the platform exposes it.
    fn cursor_position(&self) -> Option<PointerPosition>;
}
