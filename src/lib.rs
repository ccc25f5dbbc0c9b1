//! Linux userspace driver for SPI-attached ILI9486L panels (320x480,
//! RGB565) with an XPT2046 resistive touch controller, as found on the
//! common Raspberry Pi 3.5" LCD hats.
//!
//! The panel and touch drivers are generic over `embedded-hal` 1.0
//! traits; on Linux the [`display::LinuxDisplay`] constructors wire them
//! to spidev and gpio-cdev. Drawing goes through a double-buffered
//! framebuffer with dirty-rectangle tracking, so incremental refreshes
//! only stream the pixels that changed. Touch sampling runs on a
//! background thread woken by the PENIRQ line.
//!
//! ```no_run
//! use rpi_ili9486::prelude::*;
//!
//! fn main() -> rpi_ili9486::Result<()> {
//!     let mut display = LinuxDisplay::open(&DisplayConfig::new())?;
//!     display.attach_touch(TouchConfig::new())?;
//!
//!     display.clear(color::BLACK)?;
//!     display.draw_text(10, 10, "HELLO", color::WHITE)?;
//!     display.refresh()?;
//!
//!     while !display.is_touched() {
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod font;
pub mod framebuffer;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod panel;
pub mod prelude;
pub mod touch;

#[cfg(test)]
mod testutil;

pub use crate::config::{DisplayConfig, Rotation, TouchConfig};
pub use crate::display::Display;
pub use crate::error::{Error, Result};
pub use crate::touch::{TouchDriver, TouchPoint};
