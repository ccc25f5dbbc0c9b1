//! Hand-rolled embedded-hal mocks for host-side driver tests.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{ErrorType, Operation, SpiBus, SpiDevice};

/// One recorded panel-bus write, tagged with the DC line level at the
/// time of the transfer (false = command, true = data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusWrite {
    pub data: bool,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct BusLog {
    pub dc: Cell<bool>,
    pub writes: RefCell<Vec<BusWrite>>,
}

impl BusLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// The command bytes written so far, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| !w.data)
            .flat_map(|w| w.bytes.clone())
            .collect()
    }

    /// Data payload following the most recent write of command `cmd`.
    pub fn data_after(&self, cmd: u8) -> Option<Vec<u8>> {
        let writes = self.writes.borrow();
        let pos = writes
            .iter()
            .rposition(|w| !w.data && w.bytes == [cmd])?;
        writes.get(pos + 1).filter(|w| w.data).map(|w| w.bytes.clone())
    }
}

/// SpiDevice mock that records writes into a shared [`BusLog`].
pub struct LogSpiDevice {
    pub log: Rc<BusLog>,
}

impl ErrorType for LogSpiDevice {
    type Error = Infallible;
}

impl SpiDevice<u8> for LogSpiDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => self.log.writes.borrow_mut().push(BusWrite {
                    data: self.log.dc.get(),
                    bytes: bytes.to_vec(),
                }),
                Operation::Read(buf) => buf.fill(0),
                Operation::Transfer(read, write) => {
                    self.log.writes.borrow_mut().push(BusWrite {
                        data: self.log.dc.get(),
                        bytes: write.to_vec(),
                    });
                    read.fill(0);
                }
                Operation::TransferInPlace(buf) => buf.fill(0),
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// Output pin mock. When wired to a [`BusLog`] it drives the DC tag.
#[derive(Clone)]
pub struct LogPin {
    pub level: Rc<Cell<bool>>,
    dc_log: Option<Rc<BusLog>>,
}

impl LogPin {
    pub fn new() -> Self {
        Self {
            level: Rc::new(Cell::new(false)),
            dc_log: None,
        }
    }

    pub fn dc(log: Rc<BusLog>) -> Self {
        Self {
            level: Rc::new(Cell::new(false)),
            dc_log: Some(log),
        }
    }

    fn set(&mut self, level: bool) {
        self.level.set(level);
        if let Some(log) = &self.dc_log {
            log.dc.set(level);
        }
    }
}

impl embedded_hal::digital::ErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// SpiBus mock with scripted receive frames, for the touch path.
pub struct ScriptedSpiBus {
    pub responses: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
}

impl ScriptedSpiBus {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    /// Queue one 3-byte conversion response carrying a 12-bit value in
    /// the XPT2046 wire layout (bits [14:8] of byte 1, [7:3] of byte 2).
    pub fn push_adc(&mut self, value: u16) {
        let shifted = (value as u32) << 3;
        self.responses
            .push_back(vec![0, ((shifted >> 8) & 0x7F) as u8, (shifted & 0xFF) as u8]);
    }
}

impl ErrorType for ScriptedSpiBus {
    type Error = Infallible;
}

impl SpiBus<u8> for ScriptedSpiBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        self.sent.push(words.to_vec());
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        self.sent.push(write.to_vec());
        let response = self.responses.pop_front().unwrap_or_default();
        for (dst, src) in read.iter_mut().zip(response.iter().chain(core::iter::repeat(&0))) {
            *dst = *src;
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        self.sent.push(words.to_vec());
        let response = self.responses.pop_front().unwrap_or_default();
        for (dst, src) in words.iter_mut().zip(response.iter().chain(core::iter::repeat(&0))) {
            *dst = *src;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}
