use crate::config::OverlayConfig;
use crate::platform::{Bounds, Display, OverlayWindow, PlatformError, PlatformResult, WindowId};
use std::cell::Cell;
use std::rc::Rc;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::{Window, WindowAttributes, WindowLevel};

/// The overlay's native window. Created once, hidden, and reused for every show.
pub struct WinitOverlayWindow {
    window: Rc<Window>,
    visible: Cell<bool>,
}

impl WinitOverlayWindow {
    pub fn create(event_loop: &ActiveEventLoop, config: &OverlayConfig) -> PlatformResult<Self> {
        let attributes = WindowAttributes::default()
            .with_title("Jot")
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_decorations(false)
            .with_resizable(false)
            .with_visible(false)
            .with_active(false);

        #[cfg(target_os = "windows")]
        let attributes = {
            use winit::platform::windows::WindowAttributesExtWindows;
            attributes.with_skip_taskbar(true)
        };

        let window = event_loop
            .create_window(attributes)
            .map_err(|e| PlatformError::WindowUnavailable(format!("Failed to create window: {e}")))?;
        window.set_ime_allowed(true);

        Ok(Self {
            window: Rc::new(window),
            visible: Cell::new(false),
        })
    }

    pub fn window(&self) -> &Rc<Window> {
        &self.window
    }

    pub fn winit_id(&self) -> winit::window::WindowId {
        self.window.id()
    }
}

impl OverlayWindow for WinitOverlayWindow {
    fn id(&self) -> WindowId {
        u64::from(self.window.id())
    }

    fn raw_handle(&self) -> PlatformResult<RawWindowHandle> {
        self.window
            .window_handle()
            .map(|handle| handle.as_raw())
            .map_err(|e| PlatformError::WindowUnavailable(e.to_string()))
    }

    fn set_bounds(&self, bounds: &Bounds) -> PlatformResult<()> {
        self.window
            .set_outer_position(PhysicalPosition::new(bounds.position.x, bounds.position.y));
        // Platforms that resize asynchronously report the new size in a Resized event.
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(bounds.size.width, bounds.size.height));
        Ok(())
    }

    fn set_visible(&self, visible: bool) {
        self.window.set_visible(visible);
        self.visible.set(visible);
    }

    fn is_visible(&self) -> bool {
        self.window.is_visible().unwrap_or(self.visible.get())
    }

    fn request_focus(&self) {
        self.window.focus_window();
    }

    fn set_always_on_top(&self, always_on_top: bool) {
        let level = if always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        self.window.set_window_level(level);
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn displays(&self) -> Vec<Display> {
        self.window
            .available_monitors()
            .enumerate()
            .map(|(index, monitor)| {
                let position = monitor.position();
                let size = monitor.size();
                Display {
                    id: index as u32,
                    name: monitor.name().unwrap_or_else(|| format!("Display {index}")),
                    bounds: Bounds::new(position.x, position.y, size.width, size.height),
                    scale_factor: monitor.scale_factor(),
                }
            })
            .collect()
    }
}
