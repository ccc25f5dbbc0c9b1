//! XPT2046 resistive touch controller driver.
//!
//! The controller sits on its own SPI chip select with a PENIRQ line
//! that goes low while the panel is touched. A background sampling
//! thread waits on that line, takes a burst of raw conversions, filters
//! and calibrates them, and publishes the latest [`TouchPoint`] behind a
//! mutex that consumers only ever read.
//!
//! Per touch event the sampler moves through
//! `Idle -> Sampling -> Filtering -> Published -> Idle`; a wake with the
//! line high publishes a release and resets the filter so the next
//! contact starts from clean state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use log::{debug, trace, warn};

use crate::config::TouchConfig;
use crate::error::{Error, Result};

/// XPT2046 control byte: start bit plus channel-select nibble.
pub(crate) mod channel {
    pub const START_BIT: u8 = 0x80;
    pub const X_MEASURE: u8 = 0x50;
    pub const Y_MEASURE: u8 = 0x10;
    pub const Z1_MEASURE: u8 = 0x30;
    pub const Z2_MEASURE: u8 = 0x40;
    // Auxiliary inputs the chip exposes; unused by the sampling loop.
    #[allow(dead_code)]
    pub const TEMP0: u8 = 0x00;
    #[allow(dead_code)]
    pub const TEMP1: u8 = 0x70;
    #[allow(dead_code)]
    pub const VBAT: u8 = 0x20;
    #[allow(dead_code)]
    pub const VAUX: u8 = 0x60;
}

/// Samples kept per axis by the circular median filter, and raw
/// readings taken per acquisition burst.
pub const SAMPLE_COUNT: usize = 5;
/// Minimum computed pressure for a reading to count as a touch.
pub const PRESSURE_THRESHOLD: i32 = 400;
/// Full scale of the 12-bit ADC.
const ADC_MAX: i32 = 4095;
/// Bounded interrupt wait, so shutdown is observed between touches.
const IRQ_WAIT_TIMEOUT: Duration = Duration::from_millis(100);
/// Spacing between raw readings within one burst.
const INTER_SAMPLE_DELAY: Duration = Duration::from_millis(1);

/// The published touch state. `x`/`y` are screen pixels after
/// calibration; `timestamp_ms` is monotonic milliseconds since the
/// driver started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: i32,
    pub y: i32,
    pub pressed: bool,
    pub timestamp_ms: u64,
}

/// Median of a small sample set. Input order is not preserved.
fn median_of(values: &mut [i32]) -> i32 {
    values.sort_unstable();
    values[values.len() / 2]
}

/// Fixed-size circular median filter. Self-initializing: the first
/// pushed value seeds the whole window so a new contact does not drag
/// start-up transients through the median.
#[derive(Debug)]
pub struct MedianFilter {
    samples: [i32; SAMPLE_COUNT],
    index: usize,
    primed: bool,
}

impl MedianFilter {
    pub const fn new() -> Self {
        Self {
            samples: [0; SAMPLE_COUNT],
            index: 0,
            primed: false,
        }
    }

    /// Insert a value and return the current median.
    pub fn push(&mut self, value: i32) -> i32 {
        if !self.primed {
            self.samples = [value; SAMPLE_COUNT];
            self.primed = true;
        } else {
            self.samples[self.index] = value;
        }
        self.index = (self.index + 1) % SAMPLE_COUNT;

        let mut window = self.samples;
        median_of(&mut window)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a filtered raw reading to screen coordinates.
///
/// Pure function of the sample and the calibration config: optional
/// axis swap, optional inversion about the 12-bit range, then an affine
/// scale from `[cal_min, cal_max]` to `[0, dim)`, clamped.
pub fn apply_calibration(
    cal: &TouchConfig,
    raw_x: i32,
    raw_y: i32,
    width: u32,
    height: u32,
) -> (i32, i32) {
    let (mut x, mut y) = if cal.swap_xy { (raw_y, raw_x) } else { (raw_x, raw_y) };
    if cal.invert_x {
        x = ADC_MAX - x;
    }
    if cal.invert_y {
        y = ADC_MAX - y;
    }

    let scale = |v: i32, min: i32, max: i32, dim: i32| -> i32 {
        let span = max - min;
        if span <= 0 {
            return 0;
        }
        ((v - min) * dim / span).clamp(0, dim - 1)
    };
    (
        scale(x, cal.cal_x_min, cal.cal_x_max, width as i32),
        scale(y, cal.cal_y_min, cal.cal_y_max, height as i32),
    )
}

/// Wire-level reader. One conversion is a 3-byte full-duplex exchange
/// held under chip select.
pub struct Xpt2046<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> Xpt2046<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self> {
        cs.set_high().map_err(Error::init)?;
        Ok(Self { spi, cs })
    }

    /// Read one 12-bit conversion from the given channel.
    pub fn read_channel(&mut self, ch: u8) -> Result<i32> {
        let tx = [channel::START_BIT | ch, 0x00, 0x00];
        let mut rx = [0u8; 3];

        self.cs.set_low().map_err(Error::transport)?;
        let transferred = self.spi.transfer(&mut rx, &tx).map_err(Error::transport);
        self.cs.set_high().map_err(Error::transport)?;
        transferred?;

        // 12-bit result, straddling bytes 1 and 2.
        Ok((((rx[1] & 0x7F) as i32) << 5) | ((rx[2] >> 3) as i32))
    }

    pub fn read_x(&mut self) -> Result<i32> {
        self.read_channel(channel::X_MEASURE)
    }

    pub fn read_y(&mut self) -> Result<i32> {
        self.read_channel(channel::Y_MEASURE)
    }

    /// Touch pressure from the two cross-plate measurements. `z1 == 0`
    /// reads as pressure 0 (no contact), never a division by zero.
    pub fn read_pressure(&mut self) -> Result<i32> {
        let z1 = self.read_channel(channel::Z1_MEASURE)?;
        let z2 = self.read_channel(channel::Z2_MEASURE)?;
        if z1 == 0 {
            return Ok(0);
        }
        Ok((z2 - z1) * 1000 / z1)
    }
}

/// The interrupt line the sampling thread waits on. Implemented for the
/// gpio-cdev event handle on Linux and by simulated pins in tests.
pub trait IrqPin {
    /// Block until an edge event or the timeout. `Ok(true)` means an
    /// edge was consumed, `Ok(false)` a timeout.
    fn wait_edge(&mut self, timeout: Duration) -> Result<bool>;

    /// Current line level; the XPT2046 holds PENIRQ low while touched.
    fn is_pressed(&mut self) -> Result<bool>;
}

/// Cooperative shutdown flag shared between [`TouchDriver::stop`] and
/// the sampling thread, which re-checks it at every wait expiry.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sampling-thread phases for one pass through the loop.
#[derive(Debug, PartialEq, Eq)]
enum Phase {
    /// Waiting on the interrupt line.
    Idle,
    /// Line is low: acquire a burst of raw readings.
    Sampling,
    /// Line is high: publish a release.
    Released,
}

pub(crate) struct Sampler<SPI, CS, IRQ> {
    sensor: Xpt2046<SPI, CS>,
    irq: IRQ,
    filter_x: MedianFilter,
    filter_y: MedianFilter,
    calibration: Arc<Mutex<TouchConfig>>,
    shared: Arc<Mutex<TouchPoint>>,
    width: u32,
    height: u32,
    started: Instant,
}

impl<SPI, CS, IRQ> Sampler<SPI, CS, IRQ>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    IRQ: IrqPin,
{
    fn run(&mut self, token: &ShutdownToken) {
        debug!("touch sampling thread started");
        while !token.is_cancelled() {
            match self.irq.wait_edge(IRQ_WAIT_TIMEOUT) {
                Ok(_) => self.service_wake(),
                Err(e) => {
                    // Degrade to an unpressed state rather than taking
                    // the process down.
                    warn!("touch interrupt wait failed: {e}");
                    thread::sleep(IRQ_WAIT_TIMEOUT);
                }
            }
        }
        debug!("touch sampling thread stopped");
    }

    /// One pass of the per-event state machine. Crate visible so tests
    /// can drive it without a thread.
    pub(crate) fn service_wake(&mut self) {
        let phase = match self.irq.is_pressed() {
            Ok(true) => Phase::Sampling,
            Ok(false) => Phase::Released,
            Err(e) => {
                warn!("touch level read failed: {e}");
                Phase::Idle
            }
        };

        match phase {
            Phase::Sampling => {
                if let Some((raw_x, raw_y)) = self.acquire_burst() {
                    let filtered_x = self.filter_x.push(raw_x);
                    let filtered_y = self.filter_y.push(raw_y);
                    let calibration = self
                        .calibration
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    let (x, y) = apply_calibration(
                        &calibration,
                        filtered_x,
                        filtered_y,
                        self.width,
                        self.height,
                    );
                    let timestamp_ms = self.started.elapsed().as_millis() as u64;
                    self.publish(|point| {
                        *point = TouchPoint {
                            x,
                            y,
                            pressed: true,
                            timestamp_ms,
                        };
                    });
                    trace!("touch at ({x},{y}) raw ({raw_x},{raw_y})");
                }
            }
            Phase::Released => {
                self.publish(|point| point.pressed = false);
                self.filter_x.reset();
                self.filter_y.reset();
            }
            Phase::Idle => {}
        }
    }

    /// Take up to [`SAMPLE_COUNT`] raw triples, discard the invalid ones
    /// (low pressure, non-positive coordinates, or a failed transfer)
    /// and return the per-axis median of what remains.
    fn acquire_burst(&mut self) -> Option<(i32, i32)> {
        let mut xs: Vec<i32> = Vec::with_capacity(SAMPLE_COUNT);
        let mut ys: Vec<i32> = Vec::with_capacity(SAMPLE_COUNT);

        for _ in 0..SAMPLE_COUNT {
            match self.read_triple() {
                Ok((x, y, pressure)) => {
                    if x > 0 && y > 0 && pressure > PRESSURE_THRESHOLD {
                        xs.push(x);
                        ys.push(y);
                    }
                }
                Err(e) => {
                    // A transient bus failure drops this sample only.
                    trace!("touch sample dropped: {e}");
                }
            }
            thread::sleep(INTER_SAMPLE_DELAY);
        }

        if xs.is_empty() {
            return None;
        }
        Some((median_of(&mut xs), median_of(&mut ys)))
    }

    fn read_triple(&mut self) -> Result<(i32, i32, i32)> {
        let x = self.sensor.read_x()?;
        let y = self.sensor.read_y()?;
        let pressure = self.sensor.read_pressure()?;
        Ok((x, y, pressure))
    }

    fn publish(&self, update: impl FnOnce(&mut TouchPoint)) {
        let mut point = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut point);
    }
}

/// Owning handle for the touch subsystem: the published state plus the
/// sampling thread. Dropping it stops and joins the thread.
pub struct TouchDriver {
    shared: Arc<Mutex<TouchPoint>>,
    calibration: Arc<Mutex<TouchConfig>>,
    token: ShutdownToken,
    handle: Option<JoinHandle<()>>,
}

impl TouchDriver {
    /// Start the sampling thread over an already-open bus, chip-select
    /// pin and interrupt line. `width`/`height` are the screen
    /// dimensions calibration maps into.
    pub fn spawn<SPI, CS, IRQ>(
        spi: SPI,
        cs: CS,
        irq: IRQ,
        config: TouchConfig,
        width: u32,
        height: u32,
    ) -> Result<Self>
    where
        SPI: SpiBus<u8> + Send + 'static,
        CS: OutputPin + Send + 'static,
        IRQ: IrqPin + Send + 'static,
    {
        let sensor = Xpt2046::new(spi, cs)?;
        let shared = Arc::new(Mutex::new(TouchPoint::default()));
        let calibration = Arc::new(Mutex::new(config));
        let token = ShutdownToken::new();

        let mut sampler = Sampler {
            sensor,
            irq,
            filter_x: MedianFilter::new(),
            filter_y: MedianFilter::new(),
            calibration: calibration.clone(),
            shared: shared.clone(),
            width,
            height,
            started: Instant::now(),
        };
        let thread_token = token.clone();
        let handle = thread::Builder::new()
            .name("xpt2046-touch".into())
            .spawn(move || sampler.run(&thread_token))
            .map_err(Error::init)?;

        Ok(Self {
            shared,
            calibration,
            token,
            handle: Some(handle),
        })
    }

    /// Latest published touch point.
    pub fn read(&self) -> TouchPoint {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pressed(&self) -> bool {
        self.read().pressed
    }

    /// Replace the calibration transform; takes effect from the next
    /// sampling cycle.
    pub fn set_calibration(&self, config: TouchConfig) {
        *self
            .calibration
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Request shutdown and join the sampling thread. Takes effect
    /// within one wait-timeout period; a burst in progress finishes
    /// first.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TouchDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
