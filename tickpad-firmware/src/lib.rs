#![no_std]
pub mod config;
pub mod hid;
pub mod key_reporter;
pub mod key_scanner;
pub mod keyboard;
pub mod keymap;
pub mod macro_engine;
pub mod matrix;
pub mod status;
pub mod usb;

#[cfg(any(test, feature = "test-utils"))]
pub mod switch_test_stub;
#[cfg(any(test, feature = "test-utils"))]
pub mod time_driver_test_stub;
#[cfg(any(test, feature = "test-utils"))]
pub mod usb_test_stub;

#[macro_use]
mod macros;
