//! Display and touch configuration.
//!
//! Both config structs follow the builder-setter convention: construct
//! with [`Default`] (which matches the stock Waveshare/Raspberry Pi
//! wiring and the panel's maximum ratings), then override what differs.
//!
//! ```
//! use rpi_ili9486::config::{DisplayConfig, Rotation};
//!
//! let config = DisplayConfig::new()
//!     .spi_speed(40_000_000)
//!     .rotation(Rotation::Deg90)
//!     .double_buffer(false);
//! # let _ = config;
//! ```

use crate::backend::RenderBackend;

/// Native panel width in pixels (rotation 0).
pub const DISPLAY_WIDTH: u32 = 320;
/// Native panel height in pixels (rotation 0).
pub const DISPLAY_HEIGHT: u32 = 480;

/// Panel orientation. The two landscape rotations swap width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Logical dimensions for this rotation given the panel's native size.
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Rotation::Deg0 | Rotation::Deg180 => (DISPLAY_WIDTH, DISPLAY_HEIGHT),
            Rotation::Deg90 | Rotation::Deg270 => (DISPLAY_HEIGHT, DISPLAY_WIDTH),
        }
    }
}

/// Display bring-up configuration. Immutable after init except rotation,
/// which can be changed through the facade.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// SPI clock for the panel bus, in Hz.
    pub spi_speed: u32,
    /// SPI mode (0-3). The ILI9486L uses mode 0.
    pub spi_mode: u8,
    pub rotation: Rotation,
    /// Accepted for API parity; the spidev transfer path does not use a
    /// userspace DMA engine.
    pub enable_dma: bool,
    pub enable_double_buffer: bool,
    /// Target refresh rate in Hz; informational for callers pacing their
    /// own refresh loop.
    pub refresh_rate: u32,
    /// Requested render path. Anything other than SPI falls back to SPI
    /// with a warning.
    pub backend: RenderBackend,
    /// Panel SPI character device.
    pub spidev_path: String,
    /// GPIO character device the control lines live on.
    pub gpiochip_path: String,
    /// Data/command select line.
    pub dc_pin: u32,
    /// Hardware reset line.
    pub reset_pin: u32,
    /// Backlight enable line.
    pub backlight_pin: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            spi_speed: 80_000_000,
            spi_mode: 0,
            rotation: Rotation::Deg0,
            enable_dma: true,
            enable_double_buffer: true,
            refresh_rate: 60,
            backend: RenderBackend::Spi,
            spidev_path: "/dev/spidev0.0".into(),
            gpiochip_path: "/dev/gpiochip0".into(),
            dc_pin: 24,
            reset_pin: 25,
            backlight_pin: 18,
        }
    }
}

impl DisplayConfig {
    pub fn new() -> Self {
        Default::default()
    }

    #[must_use]
    pub fn spi_speed(mut self, hz: u32) -> Self {
        self.spi_speed = hz;
        self
    }

    #[must_use]
    pub fn spi_mode(mut self, mode: u8) -> Self {
        self.spi_mode = mode;
        self
    }

    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn dma(mut self, enable: bool) -> Self {
        self.enable_dma = enable;
        self
    }

    #[must_use]
    pub fn double_buffer(mut self, enable: bool) -> Self {
        self.enable_double_buffer = enable;
        self
    }

    #[must_use]
    pub fn refresh_rate(mut self, hz: u32) -> Self {
        self.refresh_rate = hz;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: RenderBackend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn spidev_path(mut self, path: impl Into<String>) -> Self {
        self.spidev_path = path.into();
        self
    }

    #[must_use]
    pub fn gpiochip_path(mut self, path: impl Into<String>) -> Self {
        self.gpiochip_path = path.into();
        self
    }

    #[must_use]
    pub fn dc_pin(mut self, pin: u32) -> Self {
        self.dc_pin = pin;
        self
    }

    #[must_use]
    pub fn reset_pin(mut self, pin: u32) -> Self {
        self.reset_pin = pin;
        self
    }

    #[must_use]
    pub fn backlight_pin(mut self, pin: u32) -> Self {
        self.backlight_pin = pin;
        self
    }
}

/// Touch controller configuration and calibration bounds.
///
/// The calibration fields define the affine transform from the 12-bit
/// raw ADC space to screen pixels; see [`crate::touch::apply_calibration`].
#[derive(Debug, Clone)]
pub struct TouchConfig {
    pub cal_x_min: i32,
    pub cal_x_max: i32,
    pub cal_y_min: i32,
    pub cal_y_max: i32,
    pub swap_xy: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Touch controller SPI character device (separate chip select from
    /// the panel).
    pub spidev_path: String,
    pub gpiochip_path: String,
    /// Chip-select line, driven manually around each conversion.
    pub cs_pin: u32,
    /// PENIRQ line; low while the panel is touched.
    pub irq_pin: u32,
    /// Touch bus clock in Hz. The XPT2046 tops out around 2.5 MHz.
    pub spi_speed: u32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            cal_x_min: 200,
            cal_x_max: 3900,
            cal_y_min: 200,
            cal_y_max: 3900,
            swap_xy: false,
            invert_x: false,
            invert_y: false,
            spidev_path: "/dev/spidev0.1".into(),
            gpiochip_path: "/dev/gpiochip0".into(),
            cs_pin: 7,
            irq_pin: 17,
            spi_speed: 2_000_000,
        }
    }
}

impl TouchConfig {
    pub fn new() -> Self {
        Default::default()
    }

    #[must_use]
    pub fn calibration(mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Self {
        self.cal_x_min = x_min;
        self.cal_x_max = x_max;
        self.cal_y_min = y_min;
        self.cal_y_max = y_max;
        self
    }

    #[must_use]
    pub fn swap_xy(mut self, swap: bool) -> Self {
        self.swap_xy = swap;
        self
    }

    #[must_use]
    pub fn invert_x(mut self, invert: bool) -> Self {
        self.invert_x = invert;
        self
    }

    #[must_use]
    pub fn invert_y(mut self, invert: bool) -> Self {
        self.invert_y = invert;
        self
    }

    #[must_use]
    pub fn spidev_path(mut self, path: impl Into<String>) -> Self {
        self.spidev_path = path.into();
        self
    }

    #[must_use]
    pub fn gpiochip_path(mut self, path: impl Into<String>) -> Self {
        self.gpiochip_path = path.into();
        self
    }

    #[must_use]
    pub fn cs_pin(mut self, pin: u32) -> Self {
        self.cs_pin = pin;
        self
    }

    #[must_use]
    pub fn irq_pin(mut self, pin: u32) -> Self {
        self.irq_pin = pin;
        self
    }

    #[must_use]
    pub fn spi_speed(mut self, hz: u32) -> Self {
        self.spi_speed = hz;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_dimensions() {
        assert_eq!(Rotation::Deg0.dimensions(), (320, 480));
        assert_eq!(Rotation::Deg90.dimensions(), (480, 320));
        assert_eq!(Rotation::Deg180.dimensions(), (320, 480));
        assert_eq!(Rotation::Deg270.dimensions(), (480, 320));
    }

    #[test]
    fn builder_overrides() {
        let c = DisplayConfig::new().spi_speed(1).double_buffer(false);
        assert_eq!(c.spi_speed, 1);
        assert!(!c.enable_double_buffer);
        assert_eq!(c.dc_pin, 24);
    }

    #[test]
    fn device_paths_accept_runtime_strings() {
        let bus = 1;
        let c = DisplayConfig::new().spidev_path(format!("/dev/spidev{bus}.0"));
        assert_eq!(c.spidev_path, "/dev/spidev1.0");

        let t = TouchConfig::new().gpiochip_path(String::from("/dev/gpiochip4"));
        assert_eq!(t.gpiochip_path, "/dev/gpiochip4");
    }
}
