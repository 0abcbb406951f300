#[cfg(feature = "platform-tests")]
mod platform_tests {
    use jot_core::overlay::ForegroundTracker;
    use jot_core::platform::{Platform, PlatformAdapter};
    use jot_core::validate_accelerator;

    #[test]
    fn test_requires_main_thread_affinity() {
        assert!(Platform::new().requires_main_thread_affinity());
    }

    #[test]
    fn test_tracker_never_arms_own_process() {
        let platform = Platform::new();
        let mut tracker = ForegroundTracker::new();

        tracker.arm(&platform);

        if let Some(handle) = tracker.armed() {
            assert!(!handle.is_current_process());
        }
    }

    #[test]
    fn test_reactivating_captured_process() {
        let platform = Platform::new();
        if let Some(handle) = platform.capture_foreground_process() {
            // Best-effort, but the call itself must not panic.
            let _ = platform.reactivate_process(&handle);
        }
    }

    #[test]
    fn test_default_accelerator_is_accepted() {
        assert!(validate_accelerator(jot_core::hotkey::DEFAULT_ACCELERATOR).is_ok());
    }
}
