//! Thread-safe display facade.
//!
//! [`Display`] wraps the panel driver in a mutex and layers the drawing
//! primitives on top of the framebuffer. Composite operations (lines,
//! circles, text) take the lock once and plot through the framebuffer
//! directly, so a multi-pixel draw is atomic with respect to refresh.
//!
//! On Linux, [`Display::open`] wires the generic driver to spidev and
//! gpio-cdev; everywhere else construct it over your own `embedded-hal`
//! implementations with [`Display::new`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use log::info;

use crate::backend::{select_backend, RenderBackend};
use crate::config::{DisplayConfig, Rotation, TouchConfig};
use crate::error::{Error, Result};
use crate::font::{glyph, GLYPH_SIZE};
use crate::framebuffer::FrameBuffer;
use crate::panel::Ili9486;
use crate::touch::{TouchDriver, TouchPoint};

/// Clip a rectangle to `[0, max_w) x [0, max_h)`. `None` when nothing
/// remains.
fn clip(x: i32, y: i32, w: i32, h: i32, max_w: i32, max_h: i32) -> Option<(i32, i32, i32, i32)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(w).min(max_w);
    let y1 = y.saturating_add(h).min(max_h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

/// Plot one pixel of a composite shape, silently skipping anything off
/// screen.
fn plot_clipped(fb: &mut FrameBuffer, x: i32, y: i32, color: u16) {
    if x >= 0 && y >= 0 && x < fb.width() as i32 && y < fb.height() as i32 {
        fb.set_pixel(x, y, color);
    }
}

/// One panel plus its optional touch overlay.
///
/// Field order matters: the touch driver drops (and joins its sampling
/// thread) before the panel releases the bus and control lines.
pub struct Display<SPI, DC, RST, BL: OutputPin> {
    touch: Option<TouchDriver>,
    panel: Mutex<Ili9486<SPI, DC, RST, BL>>,
}

impl<SPI, DC, RST, BL> Display<SPI, DC, RST, BL>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
{
    /// Bring up the panel over the given bus and pins and wrap it in the
    /// facade.
    pub fn new(spi: SPI, dc: DC, rst: RST, backlight: Option<BL>, config: &DisplayConfig) -> Result<Self> {
        let backend = select_backend(config.backend);
        debug_assert_eq!(backend, RenderBackend::Spi);

        let mut panel = Ili9486::new(spi, dc, rst, backlight, config)?;
        panel.init()?;
        info!(
            "display ready: {}x{} rotation {:?}, double buffer {}",
            panel.framebuffer().width(),
            panel.framebuffer().height(),
            panel.rotation(),
            panel.framebuffer().is_double_buffered(),
        );
        Ok(Self {
            touch: None,
            panel: Mutex::new(panel),
        })
    }

    fn panel(&self) -> MutexGuard<'_, Ili9486<SPI, DC, RST, BL>> {
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current logical width in pixels.
    pub fn width(&self) -> u32 {
        self.panel().framebuffer().width()
    }

    /// Current logical height in pixels.
    pub fn height(&self) -> u32 {
        self.panel().framebuffer().height()
    }

    pub fn rotation(&self) -> Rotation {
        self.panel().rotation()
    }

    /// Frames streamed to the panel since init.
    pub fn frame_count(&self) -> u64 {
        self.panel().frame_count()
    }

    pub fn last_refresh(&self) -> Option<Instant> {
        self.panel().last_refresh()
    }

    /// Fill the whole draw buffer with one color.
    pub fn clear(&self, color: u16) -> Result<()> {
        self.panel().framebuffer_mut().fill(color);
        Ok(())
    }

    /// Write a single pixel. Out of bounds is an error, unlike the
    /// clipped composite draws.
    pub fn set_pixel(&self, x: i32, y: i32, color: u16) -> Result<()> {
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();
        if x < 0 || y < 0 || x >= fb.width() as i32 || y >= fb.height() as i32 {
            return Err(Error::InvalidArgument);
        }
        fb.set_pixel(x, y, color);
        Ok(())
    }

    /// Read back a pixel from the draw buffer.
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<u16> {
        let panel = self.panel();
        let fb = panel.framebuffer();
        if x < 0 || y < 0 || x >= fb.width() as i32 || y >= fb.height() as i32 {
            return Err(Error::InvalidArgument);
        }
        Ok(fb.get_pixel(x, y))
    }

    /// Fill a rectangle, clipped to the screen. A rectangle that clips
    /// away entirely is not an error.
    pub fn fill_rect(&self, x: i32, y: i32, width: i32, height: i32, color: u16) -> Result<()> {
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();
        if let Some((cx, cy, cw, ch)) = clip(x, y, width, height, fb.width() as i32, fb.height() as i32)
        {
            fb.fill_rect(cx, cy, cw, ch, color);
        }
        Ok(())
    }

    /// Bresenham line between two points, any octant. Points off screen
    /// are skipped, not an error.
    pub fn draw_line(&self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16) -> Result<()> {
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();

        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            plot_clipped(fb, x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Midpoint circle outline with 8-way symmetry. A non-positive
    /// radius draws nothing.
    pub fn draw_circle(&self, cx: i32, cy: i32, radius: i32, color: u16) -> Result<()> {
        if radius <= 0 {
            return Ok(());
        }
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();

        let mut x = 0;
        let mut y = radius;
        let mut d = 3 - 2 * radius;
        while x <= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                plot_clipped(fb, px, py, color);
            }
            if d < 0 {
                d += 4 * x + 6;
            } else {
                d += 4 * (x - y) + 10;
                y -= 1;
            }
            x += 1;
        }
        Ok(())
    }

    /// Render text with the built-in 8x8 font. Newlines return to the
    /// starting column and advance one glyph row; anything outside the
    /// supported range renders as a space. Off-screen pixels are
    /// skipped.
    pub fn draw_text(&self, x: i32, y: i32, text: &str, color: u16) -> Result<()> {
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();

        let mut cursor_x = x;
        let mut cursor_y = y;
        for c in text.chars() {
            if c == '\n' {
                cursor_x = x;
                cursor_y += GLYPH_SIZE;
                continue;
            }
            let bitmap = glyph(c);
            for (row, bits) in bitmap.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    plot_clipped(fb, cursor_x + col, cursor_y + row as i32, color);
                }
            }
            cursor_x += GLYPH_SIZE;
        }
        Ok(())
    }

    /// Copy a tightly packed `width x height` RGB565 buffer to `(x, y)`,
    /// clipped to the screen.
    pub fn copy_buffer(&self, pixels: &[u16], x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        if width < 0 || height < 0 {
            return Err(Error::InvalidArgument);
        }
        if pixels.len() < (width as usize) * (height as usize) {
            return Err(Error::InvalidArgument);
        }
        let mut panel = self.panel();
        let fb = panel.framebuffer_mut();
        if let Some((cx, cy, cw, ch)) = clip(x, y, width, height, fb.width() as i32, fb.height() as i32)
        {
            let src_offset = ((cx - x) as usize, (cy - y) as usize);
            fb.copy_rows(pixels, width as usize, src_offset, cx, cy, cw, ch);
        }
        Ok(())
    }

    /// Present the drawn frame: push the dirty region (or the full
    /// screen) from the draw buffer to the panel, then swap buffers so
    /// subsequent drawing reuses the previously displayed one.
    pub fn refresh(&self) -> Result<()> {
        let mut panel = self.panel();
        let result = panel.refresh_display();
        panel.framebuffer_mut().swap();
        result
    }

    /// Push one rectangle of the draw buffer to the panel, without
    /// swapping buffers or touching the dirty state.
    pub fn refresh_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.panel().refresh_rect(x, y, width, height)
    }

    /// Change orientation. The framebuffer contents are stale afterwards;
    /// redraw before the next refresh.
    pub fn set_rotation(&self, rotation: Rotation) -> Result<()> {
        self.panel().set_rotation(rotation)
    }

    /// Attach an already-running touch driver to this display.
    pub fn set_touch(&mut self, touch: TouchDriver) {
        self.touch = Some(touch);
    }

    pub fn touch(&self) -> Option<&TouchDriver> {
        self.touch.as_ref()
    }

    /// Latest touch point, if a touch driver is attached.
    pub fn touch_point(&self) -> Option<TouchPoint> {
        self.touch.as_ref().map(TouchDriver::read)
    }

    pub fn is_touched(&self) -> bool {
        self.touch.as_ref().is_some_and(TouchDriver::is_pressed)
    }

    /// Swap in a new touch calibration at runtime.
    pub fn set_touch_calibration(&self, config: TouchConfig) -> Result<()> {
        match &self.touch {
            Some(touch) => {
                touch.set_calibration(config);
                Ok(())
            }
            None => Err(Error::InvalidArgument),
        }
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    use linux_embedded_hal::{CdevPin, SpidevBus, SpidevDevice};

    use super::*;
    use crate::gpio::{output_pin, IrqLine};

    fn mode_flags(mode: u8) -> SpiModeFlags {
        match mode {
            0 => SpiModeFlags::SPI_MODE_0,
            1 => SpiModeFlags::SPI_MODE_1,
            2 => SpiModeFlags::SPI_MODE_2,
            _ => SpiModeFlags::SPI_MODE_3,
        }
    }

    /// The concrete facade type [`Display::open`] produces.
    pub type LinuxDisplay = Display<SpidevDevice, CdevPin, CdevPin, CdevPin>;

    impl LinuxDisplay {
        /// Open the panel on spidev and gpio-cdev per the config and run
        /// the init sequence.
        pub fn open(config: &DisplayConfig) -> Result<Self> {
            let mut spi = SpidevDevice::open(&config.spidev_path).map_err(Error::init)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(config.spi_speed)
                .mode(mode_flags(config.spi_mode))
                .build();
            spi.configure(&options).map_err(Error::init)?;

            let dc = output_pin(&config.gpiochip_path, config.dc_pin, 0, "ili9486-dc")?;
            let rst = output_pin(&config.gpiochip_path, config.reset_pin, 1, "ili9486-rst")?;
            let backlight = output_pin(&config.gpiochip_path, config.backlight_pin, 0, "ili9486-bl")?;

            Self::new(spi, dc, rst, Some(backlight), config)
        }

        /// Open the touch controller's bus and lines and start its
        /// sampling thread, calibrated against the current dimensions.
        pub fn attach_touch(&mut self, config: TouchConfig) -> Result<()> {
            let mut bus = SpidevBus::open(&config.spidev_path).map_err(Error::init)?;
            // Chip select is driven manually around each conversion.
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(config.spi_speed)
                .mode(SpiModeFlags::SPI_MODE_0 | SpiModeFlags::SPI_NO_CS)
                .build();
            bus.configure(&options).map_err(Error::init)?;

            let cs = output_pin(&config.gpiochip_path, config.cs_pin, 1, "xpt2046-cs")?;
            let irq = IrqLine::open(&config.gpiochip_path, config.irq_pin, "xpt2046-irq")?;

            let (width, height) = (self.width(), self.height());
            let touch = TouchDriver::spawn(bus, cs, irq, config, width, height)?;
            self.set_touch(touch);
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::LinuxDisplay;
