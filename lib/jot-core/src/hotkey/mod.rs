mod backend;
mod registrar;

pub use backend::*;
pub use registrar::*;

use thiserror::Error;

/// Used when the configuration does not name an accelerator.
pub const DEFAULT_ACCELERATOR: &str = "CommandOrControl+Shift+Period";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HotkeyError {
    /// Another application (or this one) already owns the combination.
    #[error("'{accelerator}' is already bound by another application")]
    AlreadyBound { accelerator: String },

    #[error("'{accelerator}' is not a valid accelerator: {reason}")]
    InvalidAccelerator { accelerator: String, reason: String },

    #[error("No shortcut is bound")]
    NotBound,

    #[error("OS refused the hotkey operation: {0}")]
    Os(String),
}
