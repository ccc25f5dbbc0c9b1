//! Panel exercise: color bars, primitives and rotation.
//!
//! Run on the Pi with the hat attached:
//! `RUST_LOG=debug cargo run --example display_test`

#[cfg(target_os = "linux")]
fn main() -> rpi_ili9486::Result<()> {
    use rpi_ili9486::color;
    use rpi_ili9486::prelude::*;
    use std::thread;
    use std::time::Duration;

    env_logger::init();

    let display = LinuxDisplay::open(&DisplayConfig::new())?;

    // Full-screen color bars.
    let bars = [
        color::RED,
        color::GREEN,
        color::BLUE,
        color::YELLOW,
        color::CYAN,
        color::MAGENTA,
        color::WHITE,
    ];
    let bar_height = display.height() as i32 / bars.len() as i32;
    for (i, &bar) in bars.iter().enumerate() {
        display.fill_rect(0, i as i32 * bar_height, display.width() as i32, bar_height, bar)?;
    }
    display.refresh()?;
    thread::sleep(Duration::from_secs(2));

    // Primitives on black.
    display.clear(color::BLACK)?;
    display.fill_rect(20, 20, 120, 80, color::BLUE)?;
    display.draw_line(0, 0, 319, 479, color::WHITE)?;
    display.draw_line(319, 0, 0, 479, color::WHITE)?;
    display.draw_circle(160, 240, 100, color::GREEN)?;
    display.draw_text(60, 440, "ILI9486 DISPLAY TEST", color::YELLOW)?;
    display.refresh()?;
    thread::sleep(Duration::from_secs(2));

    // Same scene in landscape.
    display.set_rotation(Rotation::Deg90)?;
    display.clear(color::BLACK)?;
    display.draw_circle(240, 160, 100, color::RED)?;
    display.draw_text(140, 300, "ROTATED 90", color::WHITE)?;
    display.refresh()?;
    thread::sleep(Duration::from_secs(2));

    println!("frames streamed: {}", display.frame_count());
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("display_test needs Linux spidev/gpio-cdev");
}
