use crate::platform::{ForegroundProcessHandle, PlatformAdapter};
use log::{debug, warn};

/// Remembers which application had focus before the overlay appeared, so it can be handed
/// focus back on dismiss. Holds at most one handle.
#[derive(Debug, Default)]
pub struct ForegroundTracker {
    armed: Option<ForegroundProcessHandle>,
}

impl ForegroundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current foreground process. Overwrites anything already armed.
    pub fn arm<P: PlatformAdapter>(&mut self, platform: &P) {
        let captured = platform
            .capture_foreground_process()
            .filter(|handle| !handle.is_current_process());

        if let Some(previous) = &self.armed {
            debug!("Discarding unresolved foreground handle for pid {}", previous.pid);
        }

        match &captured {
            Some(handle) => debug!("Captured foreground pid {}", handle.pid),
            None => debug!("No foreground process to restore later"),
        }

        self.armed = captured;
    }

    /// Reactivates the armed process, if any, and clears it. Failures are only logged.
    pub fn consume_and_reactivate<P: PlatformAdapter>(&mut self, platform: &P) {
        let Some(handle) = self.armed.take() else {
            return;
        };

        match platform.reactivate_process(&handle) {
            Ok(()) => debug!("Reactivated pid {}", handle.pid),
            Err(e) => warn!("{e}"),
        }
    }

    pub fn armed(&self) -> Option<&ForegroundProcessHandle> {
        self.armed.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
