// ADB module - Android Debug Bridge device access
// Two interchangeable backends: the `adb` binary, or a pure Rust client
// talking to the local ADB server.

pub mod backend;
pub mod error;
pub mod rust_impl;
pub mod shell;
pub mod types;


// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, BackendKind};
pub use error::{AdbError, AdbResult};
pub use rust_impl::RustAdb;
pub use shell::AdbShell;
pub use types::{Device, DeviceControl, DeviceProvider, check_tap_bounds, parse_devices, parse_screen_size};
