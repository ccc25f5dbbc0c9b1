//! The prelude.
//!
//! Pulls in the types most programs need: the facade, the config
//! builders, colors and the error alias. Import as
//! `use rpi_ili9486::prelude::*`.

pub use crate::color;
pub use crate::config::{DisplayConfig, Rotation, TouchConfig, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use crate::display::Display;
#[cfg(target_os = "linux")]
pub use crate::display::LinuxDisplay;
pub use crate::error::{Error, Result};
pub use crate::touch::{TouchDriver, TouchPoint};
