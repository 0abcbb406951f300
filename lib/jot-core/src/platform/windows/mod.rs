use crate::platform::{
    ForegroundProcessHandle, OverlayWindow, PlatformAdapter, PlatformError, PlatformResult,
    PointerPosition, Position, ProcessId, WindowId,
};
use log::trace;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetForegroundWindow, GetWindowLongW, GetWindowThreadProcessId, IsIconic,
    IsWindow, SetForegroundWindow, SetWindowLongW, SetWindowPos, ShowWindow, GWL_EXSTYLE,
    HWND_TOPMOST, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_RESTORE,
    WS_EX_APPWINDOW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
};
use winit::raw_window_handle::RawWindowHandle;

pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

fn get_hwnd(window: &dyn OverlayWindow) -> PlatformResult<HWND> {
    if let RawWindowHandle::Win32(handle) = window.raw_handle()? {
        Ok(HWND(handle.hwnd.get() as _))
    } else {
        Err("Expected Win32 window handle".into())
    }
}

fn hwnd_from_id(window_id: WindowId) -> HWND {
    HWND(window_id as usize as _)
}

impl PlatformAdapter for WindowsPlatform {
    fn make_floating(&self, window: &dyn OverlayWindow) -> PlatformResult<()> {
        let hwnd = get_hwnd(window)?;

        unsafe {
            let current_ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE);
            let new_ex_style = (current_ex_style & !(WS_EX_APPWINDOW.0 as i32))
                | WS_EX_TOOLWINDOW.0 as i32
                | WS_EX_TOPMOST.0 as i32;

            if new_ex_style != current_ex_style {
                SetWindowLongW(hwnd, GWL_EXSTYLE, new_ex_style);
            }

            SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            )
            .map_err(|err| err.to_string())?;
        }

        Ok(())
    }

    fn capture_foreground_process(&self) -> Option<ForegroundProcessHandle> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_invalid() {
                return None;
            }

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
            if pid == 0 {
                return None;
            }

            trace!("Foreground window {:?} belongs to pid {pid}", hwnd.0);
            Some(ForegroundProcessHandle::new(
                pid as ProcessId,
                Some(hwnd.0 as usize as WindowId),
            ))
        }
    }

    fn reactivate_process(&self, handle: &ForegroundProcessHandle) -> PlatformResult<()> {
        let window_id = handle.window.ok_or_else(|| PlatformError::ReactivationFailed {
            pid: handle.pid,
            reason: "no window was captured".to_string(),
        })?;
        let hwnd = hwnd_from_id(window_id);

        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return Err(PlatformError::ReactivationFailed {
                    pid: handle.pid,
                    reason: "window no longer exists".to_string(),
                });
            }

            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }

            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(PlatformError::ReactivationFailed {
                    pid: handle.pid,
                    reason: "SetForegroundWindow was refused".to_string(),
                });
            }
        }

        Ok(())
    }

    fn cursor_position(&self) -> Option<PointerPosition> {
        let mut point = POINT::default();

        unsafe {
            GetCursorPos(&mut point).ok()?;
        }

        Some(PointerPosition::Physical(Position::new(point.x, point.y)))
    }
}
