use crate::platform::{
    ForegroundProcessHandle, OverlayWindow, PlatformAdapter, PlatformError, PlatformResult,
    PointerPosition, Position, ProcessId,
};
use log::{debug, trace};
use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject, Bool, ClassBuilder, Sel};
use objc2::{sel, MainThreadMarker};
use objc2_app_kit::{
    NSApplicationActivationOptions, NSEvent, NSPanel, NSRunningApplication, NSScreen, NSView,
    NSWindow, NSWindowCollectionBehavior, NSWindowStyleMask, NSWorkspace,
};
use std::sync::OnceLock;
use winit::raw_window_handle::RawWindowHandle;

/// `NSStatusWindowLevel`, high enough to sit above full screen applications.
const STATUS_WINDOW_LEVEL: isize = 25;

pub struct MacOSPlatform;

impl MacOSPlatform {
    pub fn new() -> Self {
        Self
    }
}

fn get_ns_window(window: &dyn OverlayWindow) -> PlatformResult<Retained<NSWindow>> {
    if let RawWindowHandle::AppKit(handle) = window.raw_handle()? {
        let ns_view = handle.ns_view.as_ptr() as *mut NSView;
        if ns_view.is_null() {
            return Err("NSView pointer is null".into());
        }

        unsafe {
            let ns_view = &*ns_view;
            ns_view
                .window()
                .ok_or_else(|| PlatformError::from("Failed to get NSWindow from NSView"))
        }
    } else {
        Err("Expected AppKit window handle".into())
    }
}

extern "C-unwind" fn can_become_key_window(_this: &AnyObject, _cmd: Sel) -> Bool {
    Bool::YES
}

extern "C-unwind" fn can_become_main_window(_this: &AnyObject, _cmd: Sel) -> Bool {
    Bool::NO
}

/// `NSPanel` subclass the overlay window is turned into. A borderless panel refuses key
/// status unless it says otherwise, and the entry field needs the keyboard.
fn overlay_panel_class() -> PlatformResult<&'static AnyClass> {
    static CLASS: OnceLock<Option<&'static AnyClass>> = OnceLock::new();

    let class = CLASS.get_or_init(|| {
        let superclass = AnyClass::get(c"NSPanel")?;
        let mut builder = ClassBuilder::new(c"JotOverlayPanel", superclass)?;
        unsafe {
            builder.add_method(
                sel!(canBecomeKeyWindow),
                can_become_key_window as extern "C-unwind" fn(_, _) -> _,
            );
            builder.add_method(
                sel!(canBecomeMainWindow),
                can_become_main_window as extern "C-unwind" fn(_, _) -> _,
            );
        }
        Some(builder.register())
    });

    class.ok_or_else(|| PlatformError::from("Could not register the overlay panel class"))
}

/// Turns the window into a non-activating panel in place. Safe to call repeatedly.
fn as_overlay_panel(ns_window: &NSWindow) -> PlatformResult<&NSPanel> {
    let class = overlay_panel_class()?;
    let object: &AnyObject = ns_window;

    if !std::ptr::eq(object.class(), class) {
        unsafe {
            objc2::ffi::object_setClass(
                object as *const AnyObject as *mut AnyObject,
                class as *const AnyClass,
            );
        }
        debug!("Overlay window converted to a non-activating panel");
    }

    Ok(unsafe { &*(ns_window as *const NSWindow as *const NSPanel) })
}

impl PlatformAdapter for MacOSPlatform {
    fn make_floating(&self, window: &dyn OverlayWindow) -> PlatformResult<()> {
        let ns_window = get_ns_window(window)?;
        let panel = as_overlay_panel(&ns_window)?;

        unsafe {
            panel.setStyleMask(panel.styleMask() | NSWindowStyleMask::NonactivatingPanel);
            panel.setFloatingPanel(true);
            panel.setBecomesKeyOnlyIfNeeded(false);
            panel.setLevel(STATUS_WINDOW_LEVEL);
            panel.setCollectionBehavior(
                NSWindowCollectionBehavior::CanJoinAllSpaces
                    | NSWindowCollectionBehavior::FullScreenAuxiliary
                    | NSWindowCollectionBehavior::IgnoresCycle,
            );
            panel.setHidesOnDeactivate(false);
        }

        Ok(())
    }

    fn reveal(&self, window: &dyn OverlayWindow) -> PlatformResult<()> {
        let ns_window = get_ns_window(window)?;
        let panel = as_overlay_panel(&ns_window)?;

        // A non-activating panel takes key status without activating Jot, so the frontmost
        // application and its Space stay as they are.
        unsafe {
            panel.makeKeyAndOrderFront(None);
        }

        Ok(())
    }

    fn capture_foreground_process(&self) -> Option<ForegroundProcessHandle> {
        unsafe {
            let workspace = NSWorkspace::sharedWorkspace();
            let frontmost = workspace.frontmostApplication()?;
            let pid = frontmost.processIdentifier();
            if pid <= 0 {
                return None;
            }

            trace!("Frontmost application pid: {pid}");
            Some(ForegroundProcessHandle::new(pid as ProcessId, None))
        }
    }

    fn reactivate_process(&self, handle: &ForegroundProcessHandle) -> PlatformResult<()> {
        let app = unsafe {
            NSRunningApplication::runningApplicationWithProcessIdentifier(handle.pid as i32)
        }
        .ok_or_else(|| PlatformError::ReactivationFailed {
            pid: handle.pid,
            reason: "process is no longer running".to_string(),
        })?;

        let activated = unsafe { app.activateWithOptions(NSApplicationActivationOptions::empty()) };
        if !activated {
            return Err(PlatformError::ReactivationFailed {
                pid: handle.pid,
                reason: "activation was refused".to_string(),
            });
        }

        Ok(())
    }

    fn cursor_position(&self) -> Option<PointerPosition> {
        let mtm = MainThreadMarker::new()?;

        unsafe {
            // AppKit reports the pointer in points with the origin at the bottom left of the
            // primary screen. Flip it to a top-left origin and leave it in points; screens
            // with different scale factors only agree in points.
            let screens = NSScreen::screens(mtm);
            let primary = screens.firstObject()?;
            let frame = primary.frame();
            let location = NSEvent::mouseLocation();

            Some(PointerPosition::Logical(Position::new(
                location.x.round() as i32,
                (frame.size.height - location.y).round() as i32,
            )))
        }
    }
}
