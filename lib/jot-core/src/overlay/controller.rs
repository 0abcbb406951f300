use crate::bus::{BusEmitter, BusError, OverlaySubmit};
use crate::config::OverlayConfig;
use crate::dispatcher::{Dispatcher, ThreadAffinityViolation};
use crate::overlay::position::OverlayPosition;
use crate::overlay::tracker::ForegroundTracker;
use crate::platform::{OverlayWindow, PlatformAdapter, PlatformError, Size};
use log::{debug, info, trace, warn};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Showing,
    Visible,
    Dismissing,
}

/// Why the overlay is going away. Only `Submitted` publishes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissReason {
    Submitted(String),
    Cancelled,
    FocusLost,
    Toggled,
    Requested,
}

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error(transparent)]
    ThreadAffinityViolation(#[from] ThreadAffinityViolation),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Owns the overlay window for the lifetime of the process and drives it through
/// `Hidden -> Showing -> Visible -> Dismissing -> Hidden`.
///
/// Every method must run on the UI thread. Off-thread callers go through the dispatcher.
pub struct OverlayController<W: OverlayWindow, P: PlatformAdapter> {
    window: W,
    platform: P,
    tracker: ForegroundTracker,
    emitter: BusEmitter,
    dispatcher: Dispatcher,
    config: OverlayConfig,
    state: OverlayState,
    always_on_top_fallback: bool,
    last_position: Option<OverlayPosition>,
}

impl<W: OverlayWindow, P: PlatformAdapter> OverlayController<W, P> {
    /// Takes ownership of an already created window, hides it and converts it into a
    /// floating panel.
    pub fn new(
        window: W,
        platform: P,
        emitter: BusEmitter,
        dispatcher: Dispatcher,
        config: OverlayConfig,
    ) -> Result<Self, OverlayError> {
        let mut controller = Self {
            window,
            platform,
            tracker: ForegroundTracker::new(),
            emitter,
            dispatcher,
            config,
            state: OverlayState::Hidden,
            always_on_top_fallback: false,
            last_position: None,
        };

        controller.check_thread("OverlayController::new")?;
        controller.window.set_visible(false);
        controller.ensure_floating();
        Ok(controller)
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn tracker(&self) -> &ForegroundTracker {
        &self.tracker
    }

    pub fn last_position(&self) -> Option<&OverlayPosition> {
        self.last_position.as_ref()
    }

    /// Whether the platform could not float the window and an always-on-top window is used
    /// instead.
    pub fn is_degraded(&self) -> bool {
        self.always_on_top_fallback
    }

    pub fn set_config(&mut self, config: OverlayConfig) {
        self.config = config;
    }

    /// Reveals the overlay on the monitor under the pointer. A no-op unless Hidden.
    pub fn show(&mut self) -> Result<(), OverlayError> {
        self.check_thread("OverlayController::show")?;

        if self.state != OverlayState::Hidden {
            trace!("show() ignored in {:?}", self.state);
            return Ok(());
        }

        self.state = OverlayState::Showing;
        self.tracker.arm(&self.platform);
        self.position_at_cursor();
        self.ensure_floating();

        if let Err(e) = self.platform.reveal(&self.window) {
            warn!("Native reveal failed, using a plain show: {e}");
            self.window.set_visible(true);
            self.window.request_focus();
        }
        self.window.request_redraw();

        debug!("Overlay showing");
        Ok(())
    }

    /// Called when the window reports it received keyboard focus.
    pub fn focus_gained(&mut self) -> bool {
        if self.state != OverlayState::Showing {
            return false;
        }
        self.state = OverlayState::Visible;
        debug!("Overlay visible");
        true
    }

    /// Called when the window reports it lost keyboard focus. Dismisses only from Visible, and
    /// only if configured to.
    pub fn focus_lost(&mut self) -> Result<(), OverlayError> {
        if self.state != OverlayState::Visible || !self.config.dismiss_on_blur {
            return Ok(());
        }
        self.dismiss(DismissReason::FocusLost)
    }

    /// Hides the overlay and hands focus back to whatever had it before. Publishes first when
    /// the reason is a submit. A no-op when already hidden.
    ///
    /// The window is hidden even if publishing fails; the publish error is returned afterwards.
    pub fn dismiss(&mut self, reason: DismissReason) -> Result<(), OverlayError> {
        self.check_thread("OverlayController::dismiss")?;

        match self.state {
            OverlayState::Hidden | OverlayState::Dismissing => {
                trace!("dismiss({reason:?}) ignored in {:?}", self.state);
                return Ok(());
            }
            OverlayState::Showing | OverlayState::Visible => {}
        }

        self.state = OverlayState::Dismissing;
        debug!("Overlay dismissing: {reason:?}");

        let published = match reason {
            DismissReason::Submitted(text) => self
                .emitter
                .publish_topic(&OverlaySubmit { text })
                .map(|sequence| info!("Submitted entry #{sequence}"))
                .map_err(OverlayError::from),
            _ => Ok(()),
        };

        self.window.set_visible(false);
        self.state = OverlayState::Hidden;
        self.tracker.consume_and_reactivate(&self.platform);

        published
    }

    pub fn hide(&mut self) -> Result<(), OverlayError> {
        self.dismiss(DismissReason::Requested)
    }

    pub fn toggle(&mut self) -> Result<(), OverlayError> {
        match self.state {
            OverlayState::Hidden => self.show(),
            OverlayState::Showing | OverlayState::Visible => self.dismiss(DismissReason::Toggled),
            OverlayState::Dismissing => Ok(()),
        }
    }

    fn check_thread(&self, operation: &'static str) -> Result<(), ThreadAffinityViolation> {
        if !self.platform.requires_main_thread_affinity() {
            return Ok(());
        }
        self.dispatcher.assert_ui_thread(operation)
    }

    fn position_at_cursor(&mut self) {
        let displays = self.window.displays();
        let cursor = self.platform.cursor_position();
        let size = Size::new(self.config.width, self.config.height);

        let Some(position) = OverlayPosition::compute(
            &displays,
            cursor.as_ref(),
            &size,
            self.config.vertical_offset,
        ) else {
            warn!("No displays reported, leaving the overlay where it was");
            return;
        };

        if let Err(e) = self.window.set_bounds(&position.bounds()) {
            warn!("Could not position overlay: {e}");
        }
        trace!("Overlay placed at {position:?}");
        self.last_position = Some(position);
    }

    fn ensure_floating(&mut self) {
        let error = match self.platform.make_floating(&self.window) {
            Ok(()) => return,
            Err(e) => e,
        };

        if !self.always_on_top_fallback {
            match &error {
                PlatformError::CapabilityUnavailable(_) => {
                    info!("{error}, falling back to an always-on-top window")
                }
                _ => warn!("Could not make the overlay float ({error}), using always-on-top"),
            }
            self.always_on_top_fallback = true;
        }
        self.window.set_always_on_top(true);
    }
}
