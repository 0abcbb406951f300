use crate::bus::BusContext;
use crate::config::OverlayConfig;
use crate::overlay::controller::{OverlayController, OverlayError, OverlayState};
use crate::overlay::render::SoftbufferPresenter;
use crate::overlay::view::{EntryAction, EntryKey, EntryView};
use crate::platform::{OverlayWindow, PlatformAdapter};
use log::{trace, warn};

/// Everything the overlay owns on the UI thread: the controller, the entry field, its own bus
/// context and, when there is a real window, the presenter.
pub struct OverlayShell<W: OverlayWindow, P: PlatformAdapter> {
    controller: OverlayController<W, P>,
    view: EntryView,
    bus: BusContext,
    presenter: Option<SoftbufferPresenter>,
}

impl<W: OverlayWindow, P: PlatformAdapter> OverlayShell<W, P> {
    pub fn new(controller: OverlayController<W, P>, mut view: EntryView, bus: BusContext) -> Self {
        view.watch_theme(&bus);
        Self {
            controller,
            view,
            bus,
            presenter: None,
        }
    }

    pub fn with_presenter(mut self, presenter: SoftbufferPresenter) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn controller(&self) -> &OverlayController<W, P> {
        &self.controller
    }

    pub fn view(&self) -> &EntryView {
        &self.view
    }

    pub fn state(&self) -> OverlayState {
        self.controller.state()
    }

    pub fn set_config(&mut self, config: OverlayConfig) {
        self.controller.set_config(config);
    }

    pub fn show(&mut self) {
        if self.controller.state() == OverlayState::Hidden {
            self.view.reset();
        }
        log_failure(self.controller.show());
    }

    pub fn hide(&mut self) {
        log_failure(self.controller.hide());
    }

    pub fn toggle(&mut self) {
        if self.controller.state() == OverlayState::Hidden {
            self.view.reset();
        }
        log_failure(self.controller.toggle());
    }

    pub fn on_focus_changed(&mut self, focused: bool) {
        if focused {
            self.controller.focus_gained();
            if self.view.on_focus_gained() {
                self.controller.window().request_redraw();
            }
        } else {
            log_failure(self.controller.focus_lost());
        }
    }

    pub fn on_key(&mut self, key: EntryKey) {
        if !matches!(
            self.controller.state(),
            OverlayState::Showing | OverlayState::Visible
        ) {
            trace!("Ignoring {key:?} while {:?}", self.controller.state());
            return;
        }

        match self.view.handle_key(key) {
            EntryAction::None => {}
            EntryAction::Redraw => self.controller.window().request_redraw(),
            EntryAction::Dismiss(reason) => log_failure(self.controller.dismiss(reason)),
        }
    }

    /// Committed IME composition behaves like typed text.
    pub fn on_ime_commit(&mut self, text: String) {
        self.on_key(EntryKey::Text(text));
    }

    /// Delivers pending bus messages addressed to the overlay.
    pub fn pump_bus(&mut self) -> usize {
        self.bus.pump()
    }

    pub fn redraw(&mut self) {
        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        if let Err(e) = presenter.present(&self.view) {
            warn!("Could not draw overlay: {e}");
        }
    }
}

fn log_failure(result: Result<(), OverlayError>) {
    if let Err(e) = result {
        warn!("{e}");
    }
}
