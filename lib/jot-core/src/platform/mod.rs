pub use common::*;
pub use traits::*;

mod common;
mod traits;

pub mod mock;

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(target_os = "macos")] {
        mod macos;
        pub type Platform = macos::MacOSPlatform;
    } else if #[cfg(target_os = "windows")] {
        mod windows;
        pub type Platform = windows::WindowsPlatform;
    } else {
        mod fallback;
        pub type Platform = fallback::FallbackPlatform;
    }
}
