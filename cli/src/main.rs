use jot_core::hotkey::HotkeyError;
use jot_core::{Config, JotHooks, JotResult};
use log::{error, info, warn};
use std::sync::Arc;

mod cli;
mod error_dialog;
mod logger;

fn main() -> JotResult<()> {
    let args = cli::parse_args();

    if let Err(e) = logger::init_logger(args.quiet, args.verbose) {
        eprintln!("Failed to initialize logger: {e}");
    }
    info!("Starting Jot {}", jot_core::version());

    let config = if args.use_defaults {
        info!("Using default configuration");
        Config::default()
    } else {
        let path = args.config_path.as_deref().and_then(|p| p.to_str());
        Config::load(path).map_err(|e| format!("Failed to load configuration: {e}"))?
    };

    if args.dry_run {
        jot_core::validate_config(&config)?;
        info!("Configuration is valid");
        return Ok(());
    }

    if let Err(e) = ctrlc::set_handler(|| {
        info!("Received Ctrl+C, shutting down...");
        jot_core::shutdown();
    }) {
        warn!("Could not install Ctrl+C handler: {e}");
    }

    let print = args.print;
    let hooks = JotHooks {
        on_submit: Box::new(move |text: String| {
            info!("Submitted: {text}");
            if print {
                println!("{text}");
            }
        }),
        on_bind_error: Arc::new(|e: &HotkeyError| {
            warn!("{e}");
            error_dialog::show_bind_error(e);
        }),
    };

    if let Err(e) = jot_core::start_with_config(config, hooks) {
        error!("{e}");
        error_dialog::show_error(&e);
        return Err(e);
    }

    info!("Jot stopped");
    Ok(())
}
