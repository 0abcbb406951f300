use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The current OS or compositor cannot provide the requested window behaviour.
    #[error("Capability unavailable on this platform: {0}")]
    CapabilityUnavailable(String),

    #[error("Could not reactivate process {pid}: {reason}")]
    ReactivationFailed { pid: ProcessId, reason: String },

    #[error("Overlay window unavailable: {0}")]
    WindowUnavailable(String),

    #[error("{0}")]
    Error(String),
}

impl From<&str> for PlatformError {
    fn from(error: &str) -> Self {
        PlatformError::Error(error.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(error: String) -> Self {
        PlatformError::Error(error)
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

pub type DisplayId = u32;
pub type ProcessId = u32;
pub type WindowId = u64;

/// The application that held OS focus right before the overlay was shown.
///
/// Single-use: it is consumed by the next reactivating hide, or replaced by the next show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundProcessHandle {
    pub pid: ProcessId,
    pub window: Option<WindowId>,
}

impl ForegroundProcessHandle {
    pub fn new(pid: ProcessId, window: Option<WindowId>) -> Self {
        Self { pid, window }
    }

    /// Whether this handle points at the overlay's own process.
    pub fn is_current_process(&self) -> bool {
        self.pid == std::process::id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub position: Position,
    pub size: Size,
}

impl Bounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            position: Position::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.position.x + self.size.width as i32 / 2,
            self.position.y + self.size.height as i32 / 2,
        )
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.x >= self.position.x
            && position.x < self.position.x + self.size.width as i32
            && position.y >= self.position.y
            && position.y < self.position.y + self.size.height as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Where the pointer is, in whichever coordinate space the OS reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerPosition {
    /// Physical desktop pixels, the same space as [`Display::bounds`].
    Physical(Position),
    /// Logical points. Each display is hit-tested against its bounds divided by its own
    /// scale factor.
    Logical(Position),
}

/// A monitor as seen by the overlay. Bounds are in physical pixels, desktop coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub id: DisplayId,
    pub name: String,
    pub bounds: Bounds,
    pub scale_factor: f64,
}

impl Display {
    /// The display's bounds in logical points.
    pub fn logical_bounds(&self) -> Bounds {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        Bounds::new(
            (self.bounds.position.x as f64 / scale).round() as i32,
            (self.bounds.position.y as f64 / scale).round() as i32,
            (self.bounds.size.width as f64 / scale).round() as u32,
            (self.bounds.size.height as f64 / scale).round() as u32,
        )
    }

    pub fn contains_pointer(&self, pointer: &PointerPosition) -> bool {
        match pointer {
            PointerPosition::Physical(position) => self.bounds.contains(position),
            PointerPosition::Logical(position) => self.logical_bounds().contains(position),
        }
    }
}
