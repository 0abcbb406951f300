use crate::platform::{
    ForegroundProcessHandle, OverlayWindow, PlatformAdapter, PlatformError, PlatformResult,
    PointerPosition,
};

/// Used on systems without a native floating panel concept (X11, Wayland compositors). The
/// controller degrades to an always-on-top window and skips reactivation.
pub struct FallbackPlatform;

impl FallbackPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformAdapter for FallbackPlatform {
    fn make_floating(&self, _window: &dyn OverlayWindow) -> PlatformResult<()> {
        Err(PlatformError::CapabilityUnavailable(
            "floating non-activating panels are not supported by this window system".to_string(),
        ))
    }

    fn capture_foreground_process(&self) -> Option<ForegroundProcessHandle> {
        None
    }

    fn reactivate_process(&self, handle: &ForegroundProcessHandle) -> PlatformResult<()> {
        Err(PlatformError::ReactivationFailed {
            pid: handle.pid,
            reason: "process reactivation is not supported by this window system".to_string(),
        })
    }

    fn cursor_position(&self) -> Option<PointerPosition> {
        None
    }
}
