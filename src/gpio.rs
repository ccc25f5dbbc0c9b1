//! GPIO character-device plumbing for the control lines.
//!
//! Output lines (DC, reset, backlight, touch chip select) are requested
//! through gpio-cdev and wrapped in [`CdevPin`] so the drivers stay
//! generic over `embedded_hal::digital::OutputPin`. The touch interrupt
//! line is requested as an edge-event source and waited on with a
//! bounded `poll(2)`.

use std::os::unix::io::AsRawFd;
use std::time::Duration;

use linux_embedded_hal::gpio_cdev::{
    Chip, EventRequestFlags, LineEventHandle, LineRequestFlags,
};
use linux_embedded_hal::CdevPin;

use crate::error::{Error, Result};
use crate::touch::IrqPin;

/// Request a line as an output with the given initial level.
pub(crate) fn output_pin(
    chip_path: &str,
    line: u32,
    initial: u8,
    consumer: &str,
) -> Result<CdevPin> {
    let mut chip = Chip::new(chip_path).map_err(Error::init)?;
    let handle = chip
        .get_line(line)
        .map_err(Error::init)?
        .request(LineRequestFlags::OUTPUT, initial, consumer)
        .map_err(Error::init)?;
    CdevPin::new(handle).map_err(Error::init)
}

/// The PENIRQ line: edge events for wakeups plus level reads to tell a
/// press from a release.
pub struct IrqLine {
    events: LineEventHandle,
}

impl IrqLine {
    pub fn open(chip_path: &str, line: u32, consumer: &str) -> Result<Self> {
        let mut chip = Chip::new(chip_path).map_err(Error::init)?;
        let events = chip
            .get_line(line)
            .map_err(Error::init)?
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::BOTH_EDGES,
                consumer,
            )
            .map_err(Error::init)?;
        Ok(Self { events })
    }
}

impl IrqPin for IrqLine {
    fn wait_edge(&mut self, timeout: Duration) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.events.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(Error::transport(err));
        }
        if ready == 0 {
            return Ok(false);
        }
        // Drain the queued event so the fd does not stay readable.
        self.events.get_event().map_err(Error::transport)?;
        Ok(true)
    }

    fn is_pressed(&mut self) -> Result<bool> {
        // Active low while touched.
        Ok(self.events.get_value().map_err(Error::transport)? == 0)
    }
}
