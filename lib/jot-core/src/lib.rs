use crate::app::JotApp;
use crate::bus::{BusContext, MessageBus, OverlaySubmit};
use crate::dispatcher::DispatchError;
use crate::event_loop_main::EventLoopMain;
use crate::hotkey::HotkeyError;
use crate::overlay::OverlayError;
use crate::platform::PlatformError;
use log::{debug, error, trace};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;
use tokio::sync::oneshot;

mod app;
pub mod bus;
pub mod config;
pub mod dispatcher;
mod event_loop_main;
pub mod hotkey;
pub mod overlay;
pub mod paths;
pub mod platform;
pub mod thread_lock;

pub use app::BindErrorHook;
pub use config::Config;
pub use hotkey::validate_accelerator;

pub fn version() -> &'static str {
    option_env!("VERSION").unwrap_or("v0.0.0-dev")
}

/// What the embedding application does with the overlay's output.
pub struct JotHooks {
    /// Called with each submitted entry, on the main context's thread.
    pub on_submit: Box<dyn Fn(String) + Send + Sync>,
    /// Called when the toggle shortcut could not be bound, at startup or on reload.
    pub on_bind_error: BindErrorHook,
}

/// Checks a configuration without starting anything.
pub fn validate_config(config: &Config) -> JotResult<()> {
    validate_accelerator(config.toggle_accelerator())?;

    let overlay = &config.overlay;
    if overlay.width == 0 || overlay.height == 0 {
        return Err("overlay.width and overlay.height must be greater than zero".into());
    }
    if !(0.0..=1.0).contains(&overlay.vertical_offset) {
        return Err("overlay.vertical_offset must be between 0.0 and 1.0".into());
    }
    Ok(())
}

pub fn start_with_config(config: Config, hooks: JotHooks) -> JotResult<()> {
    Config::set_config(config);
    start(hooks)
}

/// Runs the overlay until [`shutdown`] is called. Must be called on the process's main thread.
pub fn start(hooks: JotHooks) -> JotResult<()> {
    let bus = MessageBus::new();
    let main_context = bus.context("main")?;
    let overlay_context = bus.context("overlay")?;
    let main_emitter = main_context.emitter();

    let on_submit = hooks.on_submit;
    let submit_subscription = main_context.subscribe_topic(move |submit: OverlaySubmit| {
        on_submit(submit.text);
    });

    let (stop_tx, stop_rx) = oneshot::channel();
    let main_thread = thread::Builder::new()
        .name("jot-main-context".to_string())
        .spawn(move || {
            let _subscription = submit_subscription;
            run_main_context(main_context, stop_rx);
        })
        .map_err(|e| format!("Failed to spawn main context thread: {e}"))?;

    let fatal = Arc::new(Mutex::new(None));
    let fatal_app = fatal.clone();
    let on_bind_error = hooks.on_bind_error;
    let result = EventLoopMain::run(move |dispatcher| {
        Ok(JotApp::new(
            dispatcher,
            overlay_context,
            main_emitter,
            on_bind_error,
            fatal_app,
        ))
    });

    let _ = stop_tx.send(());
    if main_thread.join().is_err() {
        error!("Main context thread panicked");
    }

    result?;
    take_fatal(&fatal)
}

/// Returns the error the UI thread stored while starting up, if any.
fn take_fatal(slot: &Mutex<Option<JotFatalError>>) -> JotResult<()> {
    let stored = match slot.lock() {
        Ok(mut fatal) => fatal.take(),
        Err(_) => None,
    };
    match stored {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Asks the event loop to exit. Safe to call from any thread.
pub fn shutdown() {
    EventLoopMain::shutdown();
}

fn run_main_context(mut context: BusContext, mut stop: oneshot::Receiver<()>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Could not start main context runtime: {e}");
            return;
        }
    };

    runtime.block_on(async move {
        loop {
            tokio::select! {
                _ = &mut stop => break,
                delivered = context.pump_async() => {
                    trace!("Main context delivered {delivered} message(s)");
                }
            }
        }
    });
    debug!("Main context stopped");
}

#[derive(Debug, Error)]
pub enum JotFatalError {
    #[error("{0}")]
    Error(String),
    #[error(transparent)]
    PlatformError(#[from] PlatformError),
    #[error(transparent)]
    HotkeyError(#[from] HotkeyError),
    #[error(transparent)]
    OverlayError(#[from] OverlayError),
    #[error(transparent)]
    DispatchError(#[from] DispatchError),
    #[error(transparent)]
    BusError(#[from] bus::BusError),
}

pub type JotResult<T> = Result<T, JotFatalError>;

impl From<&str> for JotFatalError {
    fn from(value: &str) -> Self {
        JotFatalError::Error(value.to_owned())
    }
}

impl From<String> for JotFatalError {
    fn from(error: String) -> Self {
        JotFatalError::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_bad_accelerator_is_reported() {
        let config = Config {
            accelerator: Some("Hyper+Nope".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(JotFatalError::HotkeyError(HotkeyError::InvalidAccelerator { .. }))
        ));
    }

    #[test]
    fn test_stored_startup_error_is_returned_once() {
        let slot = Mutex::new(Some(JotFatalError::from("window creation failed")));

        assert!(matches!(take_fatal(&slot), Err(JotFatalError::Error(msg)) if msg == "window creation failed"));
        assert!(take_fatal(&slot).is_ok());
    }

    #[test]
    fn test_bad_overlay_geometry_is_reported() {
        let mut config = Config::default();
        config.overlay.vertical_offset = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.overlay.height = 0;
        assert!(validate_config(&config).is_err());
    }
}
