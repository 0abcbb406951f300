use crate::bus::{BusContext, Subscription, ThemeChanged, ThemeMode};
use crate::overlay::controller::DismissReason;
use log::debug;
use std::sync::{Arc, Mutex};

/// Keyboard input as the entry field cares about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    Text(String),
    Backspace,
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    None,
    Redraw,
    Dismiss(DismissReason),
}

/// The overlay's single-line entry field.
pub struct EntryView {
    text: String,
    theme: ThemeMode,
    pending_theme: Arc<Mutex<Option<ThemeMode>>>,
    _theme_subscription: Option<Subscription>,
}

impl EntryView {
    pub fn new(theme: ThemeMode) -> Self {
        Self {
            text: String::new(),
            theme,
            pending_theme: Arc::new(Mutex::new(None)),
            _theme_subscription: None,
        }
    }

    /// Listens for `theme.changed` on the overlay's bus context. The latest value is applied
    /// on the next focus gain.
    pub fn watch_theme(&mut self, context: &BusContext) {
        let pending = self.pending_theme.clone();
        self._theme_subscription = Some(context.subscribe_topic(move |changed: ThemeChanged| {
            if let Ok(mut pending) = pending.lock() {
                *pending = Some(changed.mode);
            }
        }));
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    /// Clears the field for a fresh entry.
    pub fn reset(&mut self) {
        self.text.clear();
    }

    /// Applies the most recent theme message, if any. Returns whether the theme changed.
    pub fn on_focus_gained(&mut self) -> bool {
        let pending = match self.pending_theme.lock() {
            Ok(mut pending) => pending.take(),
            Err(_) => None,
        };

        match pending {
            Some(mode) if mode != self.theme => {
                debug!("Overlay theme -> {mode}");
                self.theme = mode;
                true
            }
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: EntryKey) -> EntryAction {
        match key {
            EntryKey::Text(text) => {
                let printable: String = text.chars().filter(|c| !c.is_control()).collect();
                if printable.is_empty() {
                    return EntryAction::None;
                }
                self.text.push_str(&printable);
                EntryAction::Redraw
            }
            EntryKey::Backspace => match self.text.pop() {
                Some(_) => EntryAction::Redraw,
                None => EntryAction::None,
            },
            EntryKey::Enter => {
                let text = self.text.trim().to_string();
                self.text.clear();
                if text.is_empty() {
                    EntryAction::Dismiss(DismissReason::Cancelled)
                } else {
                    EntryAction::Dismiss(DismissReason::Submitted(text))
                }
            }
            EntryKey::Escape => {
                self.text.clear();
                EntryAction::Dismiss(DismissReason::Cancelled)
            }
            EntryKey::Other => EntryAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageBus;

    fn typed(view: &mut EntryView, text: &str) {
        for c in text.chars() {
            view.handle_key(EntryKey::Text(c.to_string()));
        }
    }

    #[test]
    fn test_enter_trims_and_submits() {
        let mut view = EntryView::new(ThemeMode::Light);
        typed(&mut view, "  buy milk ");

        assert_eq!(
            view.handle_key(EntryKey::Enter),
            EntryAction::Dismiss(DismissReason::Submitted("buy milk".to_string()))
        );
        assert!(view.text().is_empty());
    }

    #[test]
    fn test_empty_enter_cancels() {
        let mut view = EntryView::new(ThemeMode::Light);
        typed(&mut view, "   ");

        assert_eq!(
            view.handle_key(EntryKey::Enter),
            EntryAction::Dismiss(DismissReason::Cancelled)
        );
    }

    #[test]
    fn test_escape_cancels_and_clears() {
        let mut view = EntryView::new(ThemeMode::Light);
        typed(&mut view, "draft");

        assert_eq!(
            view.handle_key(EntryKey::Escape),
            EntryAction::Dismiss(DismissReason::Cancelled)
        );
        assert!(view.text().is_empty());
    }

    #[test]
    fn test_backspace_handles_multibyte() {
        let mut view = EntryView::new(ThemeMode::Light);
        typed(&mut view, "née");

        assert_eq!(view.handle_key(EntryKey::Backspace), EntryAction::Redraw);
        assert_eq!(view.text(), "né");

        view.reset();
        assert_eq!(view.handle_key(EntryKey::Backspace), EntryAction::None);
    }

    #[test]
    fn test_control_characters_ignored() {
        let mut view = EntryView::new(ThemeMode::Light);

        assert_eq!(
            view.handle_key(EntryKey::Text("\r".to_string())),
            EntryAction::None
        );
        assert_eq!(view.handle_key(EntryKey::Other), EntryAction::None);
        assert!(view.text().is_empty());
    }

    #[test]
    fn test_theme_applies_on_focus_only() {
        let bus = MessageBus::new();
        let main = bus.context("main").unwrap();
        let mut overlay = bus.context("overlay").unwrap();
        let mut view = EntryView::new(ThemeMode::Light);
        view.watch_theme(&overlay);

        main.publish_topic(&ThemeChanged {
            mode: ThemeMode::Dark,
        })
        .unwrap();
        overlay.pump();
        assert_eq!(view.theme(), ThemeMode::Light);

        assert!(view.on_focus_gained());
        assert_eq!(view.theme(), ThemeMode::Dark);
        assert!(!view.on_focus_gained());
    }

    #[test]
    fn test_latest_theme_wins() {
        let bus = MessageBus::new();
        let main = bus.context("main").unwrap();
        let mut overlay = bus.context("overlay").unwrap();
        let mut view = EntryView::new(ThemeMode::Light);
        view.watch_theme(&overlay);

        for mode in [ThemeMode::Dark, ThemeMode::Light, ThemeMode::Dark] {
            main.publish_topic(&ThemeChanged { mode }).unwrap();
        }
        overlay.pump();
        view.on_focus_gained();

        assert_eq!(view.theme(), ThemeMode::Dark);
    }
}
