use jot_core::hotkey::HotkeyError;
use jot_core::JotFatalError;
use native_dialog::{DialogBuilder, MessageLevel};

/// Show an error dialog for a fatal error
pub fn show_error(error: &JotFatalError) {
    let title = "Jot Error";
    let message = match error {
        JotFatalError::Error(msg) => msg.clone(),
        JotFatalError::PlatformError(e) => format!("{}", e),
        JotFatalError::HotkeyError(e) => format!("{}", e),
        JotFatalError::OverlayError(e) => format!("{}", e),
        JotFatalError::DispatchError(e) => format!("{}", e),
        JotFatalError::BusError(e) => format!("{}", e),
    };

    let _ = DialogBuilder::message()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_text(&message)
        .alert()
        .show();
}

/// Tell the user the overlay shortcut could not be bound. Jot keeps running.
pub fn show_bind_error(error: &HotkeyError) {
    let _ = DialogBuilder::message()
        .set_level(MessageLevel::Warning)
        .set_title("Jot Shortcut")
        .set_text(&bind_error_message(error))
        .alert()
        .show();
}

fn bind_error_message(error: &HotkeyError) -> String {
    match error {
        HotkeyError::AlreadyBound { accelerator } => format!(
            "{accelerator} is already used by another application. Pick a different shortcut in the config file."
        ),
        HotkeyError::InvalidAccelerator { accelerator, reason } => {
            format!("'{accelerator}' is not a valid shortcut: {reason}")
        }
        other => format!("The overlay shortcut could not be registered: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_the_shortcut() {
        let message = bind_error_message(&HotkeyError::AlreadyBound {
            accelerator: "Alt+Space".to_string(),
        });
        assert!(message.starts_with("Alt+Space is already used"));
    }
}
