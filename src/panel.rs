//! ILI9486L panel controller driver.
//!
//! Generic over the panel's SPI device and the DC/RST/backlight control
//! pins, so the whole command path runs against mocks on the host. The
//! Linux constructor in [`crate::display`] wires it to spidev and
//! gpio-cdev lines.
//!
//! Lifecycle: `Uninitialized -> Reset -> Configured -> Active`. A failed
//! [`Ili9486::configure`] is not resumable; reset and configure again.

use std::thread;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use log::{debug, trace};

use crate::config::{DisplayConfig, Rotation, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::{Error, Result};
use crate::framebuffer::FrameBuffer;

/// ILI9486L command bytes.
pub(crate) mod command {
    pub const SLPOUT: u8 = 0x11; // Sleep Out
    pub const DISPON: u8 = 0x29; // Display On
    pub const CASET: u8 = 0x2A; // Column Address Set
    pub const PASET: u8 = 0x2B; // Page Address Set
    pub const RAMWR: u8 = 0x2C; // Memory Write
    pub const MADCTL: u8 = 0x36; // Memory Access Control
    pub const PIXFMT: u8 = 0x3A; // Interface Pixel Format
    pub const FRMCTR1: u8 = 0xB1; // Frame Rate Control (normal mode)
    pub const DFUNCTR: u8 = 0xB6; // Display Function Control
    pub const PWCTR1: u8 = 0xC0; // Power Control 1
    pub const PWCTR2: u8 = 0xC1; // Power Control 2
    pub const VMCTR1: u8 = 0xC5; // VCOM Control 1
    pub const VMCTR2: u8 = 0xC7; // VCOM Control 2
    pub const GMCTRP1: u8 = 0xE0; // Positive Gamma Correction
    pub const GMCTRN1: u8 = 0xE1; // Negative Gamma Correction
}

bitflags! {
    /// Memory-access-control register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Madctl: u8 {
        const MY = 0x80; // row address order
        const MX = 0x40; // column address order
        const MV = 0x20; // row/column exchange
        const ML = 0x10; // vertical refresh order
        const BGR = 0x08; // BGR subpixel order
        const MH = 0x04; // horizontal refresh order
    }
}

impl From<Rotation> for Madctl {
    fn from(rotation: Rotation) -> Self {
        // The panel reports blue/green swapped relative to RGB, so BGR
        // is always set.
        let base = Madctl::BGR;
        match rotation {
            Rotation::Deg0 => base | Madctl::MX,
            Rotation::Deg90 => base | Madctl::MV,
            Rotation::Deg180 => base | Madctl::MY,
            Rotation::Deg270 => base | Madctl::MX | Madctl::MY | Madctl::MV,
        }
    }
}

const GAMMA_POSITIVE: [u8; 15] = [
    0x0F, 0x24, 0x1C, 0x0A, 0x0F, 0x08, 0x43, 0x88, 0x32, 0x0F, 0x10, 0x06, 0x0F, 0x07, 0x00,
];
const GAMMA_NEGATIVE: [u8; 15] = [
    0x0F, 0x38, 0x30, 0x09, 0x0F, 0x0F, 0x4E, 0x77, 0x3C, 0x07, 0x10, 0x05, 0x23, 0x1B, 0x00,
];

const RESET_PULSE: Duration = Duration::from_millis(10);
const RESET_BOOT_WAIT: Duration = Duration::from_millis(120);
const SLPOUT_WAIT: Duration = Duration::from_millis(120);
const DISPON_WAIT: Duration = Duration::from_millis(100);

/// Panel state: controller connection, pixel store and refresh
/// bookkeeping.
pub struct Ili9486<SPI, DC, RST, BL: OutputPin> {
    spi: SPI,
    dc: DC,
    rst: RST,
    backlight: Option<BL>,
    fb: FrameBuffer,
    tx_buffer: Vec<u8>,
    rotation: Rotation,
    frame_count: u64,
    last_refresh: Option<Instant>,
}

impl<SPI, DC, RST, BL> Ili9486<SPI, DC, RST, BL>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
{
    /// Allocate buffers and take ownership of the bus and control pins.
    /// No hardware traffic happens until [`Self::init`].
    pub fn new(spi: SPI, dc: DC, rst: RST, backlight: Option<BL>, config: &DisplayConfig) -> Result<Self> {
        let (width, height) = config.rotation.dimensions();
        let fb = FrameBuffer::new(width, height, config.enable_double_buffer)?;

        // Scratch buffer sized for one full frame of big-endian pixels.
        let frame_bytes = (DISPLAY_WIDTH * DISPLAY_HEIGHT * 2) as usize;
        let mut tx_buffer = Vec::new();
        tx_buffer.try_reserve_exact(frame_bytes).map_err(|_| Error::Memory)?;
        tx_buffer.resize(frame_bytes, 0);

        Ok(Self {
            spi,
            dc,
            rst,
            backlight,
            fb,
            tx_buffer,
            rotation: config.rotation,
            frame_count: 0,
            last_refresh: None,
        })
    }

    /// Full bring-up: backlight on, hardware reset, configuration
    /// sequence. Failure is [`Error::Init`] and leaves the panel
    /// unusable until reset again.
    pub fn init(&mut self) -> Result<()> {
        if let Some(bl) = self.backlight.as_mut() {
            bl.set_high().map_err(Error::init)?;
        }
        self.hard_reset()?;
        self.configure()?;
        debug!(
            "panel initialized: {}x{} rotation {:?}",
            self.fb.width(),
            self.fb.height(),
            self.rotation
        );
        Ok(())
    }

    /// Drive the reset line low for 10 ms, release it, then wait out the
    /// controller's internal boot.
    pub fn hard_reset(&mut self) -> Result<()> {
        self.rst.set_low().map_err(Error::init)?;
        thread::sleep(RESET_PULSE);
        self.rst.set_high().map_err(Error::init)?;
        thread::sleep(RESET_BOOT_WAIT);
        Ok(())
    }

    /// Issue the fixed ILI9486L configuration sequence.
    pub fn configure(&mut self) -> Result<()> {
        self.configure_sequence().map_err(|e| match e {
            Error::Transport(msg) => Error::Init(msg),
            other => other,
        })
    }

    fn configure_sequence(&mut self) -> Result<()> {
        self.write_command(command::SLPOUT, &[])?;
        thread::sleep(SLPOUT_WAIT);

        // 16-bit RGB565 over both the DBI and DPI interfaces.
        self.write_command(command::PIXFMT, &[0x55])?;

        self.write_command(command::PWCTR1, &[0x0F, 0x0F])?;
        self.write_command(command::PWCTR2, &[0x41])?;
        self.write_command(command::VMCTR1, &[0x00, 0x35, 0x80])?;
        self.write_command(command::VMCTR2, &[0x00])?;
        self.write_command(command::FRMCTR1, &[0x00, 0x1B])?;
        self.write_command(command::DFUNCTR, &[0x00, 0x02, 0x3B])?;
        self.write_command(command::GMCTRP1, &GAMMA_POSITIVE)?;
        self.write_command(command::GMCTRN1, &GAMMA_NEGATIVE)?;

        self.write_madctl(self.rotation)?;

        self.write_command(command::DISPON, &[])?;
        thread::sleep(DISPON_WAIT);
        Ok(())
    }

    /// Change the panel orientation and reflow the logical dimensions.
    /// Does not redraw; buffer contents are stale until the caller does.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<()> {
        self.write_madctl(rotation)?;
        self.rotation = rotation;
        let (width, height) = rotation.dimensions();
        self.fb.set_dimensions(width, height);
        debug!("rotation set to {:?} ({}x{})", rotation, width, height);
        Ok(())
    }

    fn write_madctl(&mut self, rotation: Rotation) -> Result<()> {
        let madctl = Madctl::from(rotation);
        self.write_command(command::MADCTL, &[madctl.bits()])
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    pub(crate) fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub(crate) fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.fb
    }

    /// Arm the controller for a pixel stream covering the given window.
    /// Callers validate the bounds first; a negative coordinate would
    /// smear sign bits into the address bytes.
    pub(crate) fn set_window(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let x_end = x + width - 1;
        let y_end = y + height - 1;
        self.write_command(
            command::CASET,
            &[(x >> 8) as u8, x as u8, (x_end >> 8) as u8, x_end as u8],
        )?;
        self.write_command(
            command::PASET,
            &[(y >> 8) as u8, y as u8, (y_end >> 8) as u8, y_end as u8],
        )?;
        self.write_command(command::RAMWR, &[])
    }

    /// Stream one rectangle from the draw buffer to the panel.
    ///
    /// The rectangle must lie within the current logical bounds. Pixels
    /// are converted to big-endian byte pairs into the scratch buffer
    /// and pushed in a single data write.
    pub fn refresh_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let (fb_width, fb_height) = (self.fb.width() as i32, self.fb.height() as i32);
        if x < 0 || y < 0 || width <= 0 || height <= 0 || x + width > fb_width || y + height > fb_height
        {
            return Err(Error::InvalidArgument);
        }

        self.set_window(x, y, width, height)?;

        let stride = fb_width as usize;
        let source = self.fb.draw_source();
        let mut out = 0;
        for row in 0..height as usize {
            let start = (y as usize + row) * stride + x as usize;
            for &pixel in &source[start..start + width as usize] {
                self.tx_buffer[out] = (pixel >> 8) as u8;
                self.tx_buffer[out + 1] = pixel as u8;
                out += 2;
            }
        }

        let byte_count = (width * height * 2) as usize;
        self.dc.set_high().map_err(Error::transport)?;
        self.spi.write(&self.tx_buffer[..byte_count]).map_err(Error::transport)?;

        self.frame_count += 1;
        self.last_refresh = Some(Instant::now());
        trace!("refreshed rect ({x},{y}) {width}x{height}, frame {}", self.frame_count);
        Ok(())
    }

    /// Refresh the dirty rectangle if one is pending (clearing it),
    /// otherwise the full screen. This is what keeps incremental UI
    /// updates proportional to the changed area.
    pub fn refresh_display(&mut self) -> Result<()> {
        if let Some((x, y, width, height)) = self.fb.dirty().bounds() {
            let result = self.refresh_rect(x, y, width, height);
            self.fb.clear_dirty();
            return result;
        }
        let (width, height) = (self.fb.width() as i32, self.fb.height() as i32);
        self.refresh_rect(0, 0, width, height)
    }

    fn write_command(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        self.dc.set_low().map_err(Error::transport)?;
        self.spi.write(&[cmd]).map_err(Error::transport)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(Error::transport)?;
            self.spi.write(data).map_err(Error::transport)?;
        }
        Ok(())
    }
}

impl<SPI, DC, RST, BL: OutputPin> Drop for Ili9486<SPI, DC, RST, BL> {
    fn drop(&mut self) {
        // Backlight off; pin release happens via the pin types' own Drop.
        if let Some(bl) = self.backlight.as_mut() {
            let _ = bl.set_low();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{BusLog, LogPin, LogSpiDevice};

    type TestPanel = Ili9486<LogSpiDevice, LogPin, LogPin, LogPin>;

    fn panel(config: &DisplayConfig) -> (TestPanel, std::rc::Rc<BusLog>) {
        let log = BusLog::new();
        let spi = LogSpiDevice { log: log.clone() };
        let dc = LogPin::dc(log.clone());
        let p = Ili9486::new(spi, dc, LogPin::new(), Some(LogPin::new()), config).unwrap();
        (p, log)
    }

    #[test]
    fn configure_emits_fixed_sequence() {
        let config = DisplayConfig::new();
        let (mut p, log) = panel(&config);
        p.configure().unwrap();

        assert_eq!(
            log.commands(),
            vec![
                command::SLPOUT,
                command::PIXFMT,
                command::PWCTR1,
                command::PWCTR2,
                command::VMCTR1,
                command::VMCTR2,
                command::FRMCTR1,
                command::DFUNCTR,
                command::GMCTRP1,
                command::GMCTRN1,
                command::MADCTL,
                command::DISPON,
            ]
        );
        assert_eq!(log.data_after(command::PIXFMT), Some(vec![0x55]));
        assert_eq!(log.data_after(command::GMCTRP1), Some(GAMMA_POSITIVE.to_vec()));
        assert_eq!(log.data_after(command::GMCTRN1), Some(GAMMA_NEGATIVE.to_vec()));
    }

    #[test]
    fn madctl_always_carries_bgr() {
        for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
            assert!(Madctl::from(rotation).contains(Madctl::BGR));
        }
        assert_eq!(Madctl::from(Rotation::Deg0).bits(), 0x48);
        assert_eq!(Madctl::from(Rotation::Deg90).bits(), 0x28);
        assert_eq!(Madctl::from(Rotation::Deg180).bits(), 0x88);
        assert_eq!(Madctl::from(Rotation::Deg270).bits(), 0xE8);
    }

    #[test]
    fn rotation_roundtrip_restores_dimensions() {
        let config = DisplayConfig::new();
        let (mut p, _log) = panel(&config);
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (320, 480));
        p.set_rotation(Rotation::Deg90).unwrap();
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (480, 320));
        p.set_rotation(Rotation::Deg0).unwrap();
        assert_eq!((p.framebuffer().width(), p.framebuffer().height()), (320, 480));
    }

    #[test]
    fn set_window_encodes_big_endian_bounds() {
        let config = DisplayConfig::new();
        let (mut p, log) = panel(&config);
        p.set_window(10, 300, 100, 50).unwrap();
        assert_eq!(log.data_after(command::CASET), Some(vec![0, 10, 0, 109]));
        assert_eq!(log.data_after(command::PASET), Some(vec![0x01, 0x2C, 0x01, 0x5D]));
        assert_eq!(*log.commands().last().unwrap(), command::RAMWR);
    }

    #[test]
    fn refresh_rect_rejects_out_of_bounds() {
        let config = DisplayConfig::new();
        let (mut p, _log) = panel(&config);
        assert!(matches!(p.refresh_rect(-1, 0, 10, 10), Err(Error::InvalidArgument)));
        assert!(matches!(p.refresh_rect(0, 0, 321, 10), Err(Error::InvalidArgument)));
        assert!(matches!(p.refresh_rect(310, 0, 11, 10), Err(Error::InvalidArgument)));
        assert!(matches!(p.refresh_rect(0, 0, 0, 10), Err(Error::InvalidArgument)));
    }

    #[test]
    fn refresh_rect_streams_big_endian_pixels() {
        let config = DisplayConfig::new().double_buffer(false);
        let (mut p, log) = panel(&config);
        p.framebuffer_mut().set_pixel(0, 0, 0xF800);
        p.framebuffer_mut().set_pixel(1, 0, 0x07E0);
        p.refresh_rect(0, 0, 2, 1).unwrap();

        let writes = log.writes.borrow();
        let payload = writes.last().unwrap();
        assert!(payload.data);
        assert_eq!(payload.bytes, vec![0xF8, 0x00, 0x07, 0xE0]);
        assert_eq!(p.frame_count(), 1);
        assert!(p.last_refresh().is_some());
    }

    #[test]
    fn refresh_rect_streams_drawn_pixels_when_double_buffered() {
        let config = DisplayConfig::new();
        let (mut p, log) = panel(&config);
        assert!(p.framebuffer().is_double_buffered());
        p.framebuffer_mut().set_pixel(0, 0, 0xF800);
        p.refresh_rect(0, 0, 1, 1).unwrap();

        let writes = log.writes.borrow();
        let payload = writes.last().unwrap();
        assert!(payload.data);
        assert_eq!(payload.bytes, vec![0xF8, 0x00]);
    }

    #[test]
    fn refresh_display_uses_and_clears_dirty_rect() {
        let config = DisplayConfig::new().double_buffer(false);
        let (mut p, log) = panel(&config);
        p.framebuffer_mut().fill_rect(10, 20, 4, 2, 0x1234);
        p.refresh_display().unwrap();

        assert_eq!(log.data_after(command::CASET), Some(vec![0, 10, 0, 13]));
        assert_eq!(log.data_after(command::PASET), Some(vec![0, 20, 0, 21]));
        assert!(p.framebuffer().dirty().is_empty());

        // Nothing dirty: next refresh covers the whole screen.
        p.refresh_display().unwrap();
        assert_eq!(log.data_after(command::CASET), Some(vec![0, 0, 0x01, 0x3F]));
        assert_eq!(p.frame_count(), 2);
    }
}
