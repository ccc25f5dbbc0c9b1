//! RGB565 color handling.
//!
//! The panel is driven in 16-bit RGB565 (5 bits red, 6 bits green,
//! 5 bits blue). Colors cross the public API as plain `u16` words in the
//! framebuffer's native layout; [`crate::panel`] converts to big-endian
//! byte pairs only at transfer time.

/// Named colors, RGB565.
pub const BLACK: u16 = 0x0000;
pub const WHITE: u16 = 0xFFFF;
pub const RED: u16 = 0xF800;
pub const GREEN: u16 = 0x07E0;
pub const BLUE: u16 = 0x001F;
pub const YELLOW: u16 = 0xFFE0;
pub const CYAN: u16 = 0x07FF;
pub const MAGENTA: u16 = 0xF81F;

/// Pack an 8-bit-per-channel color into RGB565.
#[inline]
pub const fn rgb_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    (((r & 0xF8) as u16) << 8) | (((g & 0xFC) as u16) << 3) | ((b >> 3) as u16)
}

/// Expand an RGB565 word back to 8-bit channels.
///
/// The truncated low bits are restored by left-shifting only, not by bit
/// replication or rounding, so the expansion is lossy but deterministic:
/// `rgb565_to_rgb(rgb_to_rgb565(r, g, b))` returns `(r & 0xF8, g & 0xFC,
/// b & 0xF8)`.
#[inline]
pub const fn rgb565_to_rgb(color: u16) -> (u8, u8, u8) {
    let r = ((color >> 11) as u8) << 3;
    let g = (((color >> 5) & 0x3F) as u8) << 2;
    let b = ((color & 0x1F) as u8) << 3;
    (r, g, b)
}
