//! Touch exercise: paints a marker wherever the panel is pressed.
//!
//! `RUST_LOG=debug cargo run --example touch_test`

#[cfg(target_os = "linux")]
fn main() -> rpi_ili9486::Result<()> {
    use rpi_ili9486::color;
    use rpi_ili9486::prelude::*;
    use std::thread;
    use std::time::Duration;

    env_logger::init();

    // Single buffer so markers accumulate across refreshes.
    let mut display = LinuxDisplay::open(&DisplayConfig::new().double_buffer(false))?;
    display.attach_touch(TouchConfig::new())?;

    display.clear(color::BLACK)?;
    display.draw_text(40, 8, "TOUCH TEST - DRAW SOMETHING", color::WHITE)?;
    display.refresh()?;

    let mut last_timestamp = 0;
    for _ in 0..600 {
        if let Some(point) = display.touch_point() {
            if point.pressed && point.timestamp_ms != last_timestamp {
                last_timestamp = point.timestamp_ms;
                println!("touch at ({}, {})", point.x, point.y);
                display.fill_rect(point.x - 2, point.y - 2, 5, 5, color::GREEN)?;
                display.draw_circle(point.x, point.y, 8, color::RED)?;
                display.refresh()?;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("touch_test needs Linux spidev/gpio-cdev");
}
