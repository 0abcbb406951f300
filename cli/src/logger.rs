use colored::*;
use jot_core::paths;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

/// Crates whose debug output drowns out Jot's own unless asked for with `--verbose`.
const NOISY_TARGETS: &[&str] = &["winit", "cosmic_text", "softbuffer", "notify", "global_hotkey"];

pub struct JotLogger {
    quiet: bool,
    verbose: bool,
    log_file: Mutex<Option<File>>,
    target_colors: Mutex<HashMap<String, usize>>,
}

impl JotLogger {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let log_path = paths::ensure_data_dir().and_then(|_| paths::log_file_path());
        let log_file = match &log_path {
            Some(path) => match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
            {
                Ok(file) => Some(file),
                Err(e) => {
                    eprintln!("Warning: Failed to open log file at {:?}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        Self {
            quiet,
            verbose,
            log_file: Mutex::new(log_file),
            target_colors: Mutex::new(HashMap::new()),
        }
    }

    fn color_for_target(&self, target: &str) -> ColoredString {
        let colors: &[fn(&str) -> ColoredString] = &[
            |s| s.green(),
            |s| s.yellow(),
            |s| s.blue(),
            |s| s.magenta(),
            |s| s.cyan(),
        ];

        let index = match self.target_colors.lock() {
            Ok(mut target_colors) => {
                let next = target_colors.len() % colors.len();
                *target_colors.entry(target.to_string()).or_insert(next)
            }
            Err(_) => 0,
        };
        colors[index](target)
    }

    fn format_log(&self, record: &Record) -> String {
        let level = level_tag(record.level());
        let target = short_target(record.target());
        let line = match target {
            Some(target) => format!(
                "{} [{}] {}",
                level,
                self.color_for_target(target).dimmed(),
                record.args()
            ),
            None => format!("{} {}", level, record.args()),
        };

        match record.level() {
            Level::Error => line.red().bold().to_string(),
            Level::Warn => line.yellow().bold().to_string(),
            Level::Info => line.replacen(level, &level.green().bold().to_string(), 1),
            Level::Debug => line.replacen(level, &level.blue().bold().to_string(), 1),
            Level::Trace => line.replacen(level, &level.white().bold().to_string(), 1),
        }
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "[E]",
        Level::Warn => "[W]",
        Level::Info => "[I]",
        Level::Debug => "[D]",
        Level::Trace => "[T]",
    }
}

fn short_target(target: &str) -> Option<&str> {
    if target.is_empty() {
        return None;
    }
    target.split("::").last()
}

fn format_log_plain(record: &Record) -> String {
    match short_target(record.target()) {
        Some(target) => format!("{} [{}] {}", level_tag(record.level()), target, record.args()),
        None => format!("{} {}", level_tag(record.level()), record.args()),
    }
}

impl Log for JotLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if self.quiet {
            return metadata.level() <= Level::Info;
        }
        if self.verbose {
            return true;
        }

        let crate_name = metadata.target().split("::").next().unwrap_or_default();
        if NOISY_TARGETS.contains(&crate_name) {
            return metadata.level() <= Level::Info;
        }
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        println!("{}", self.format_log(record));

        if let Ok(mut file) = self.log_file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = writeln!(file, "{}", format_log_plain(record));
                let _ = file.flush();
            }
        }
    }

    fn flush(&self) {}
}

pub fn init_logger(quiet: bool, verbose: bool) -> Result<(), log::SetLoggerError> {
    let logger = JotLogger::new(quiet, verbose);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
