//! Pixel buffers and dirty-rectangle tracking.
//!
//! [`FrameBuffer`] owns the front buffer (what the panel last received)
//! and, when double buffering is enabled, a back buffer that all
//! drawing mutates. Refresh streams the draw buffer directly, so the
//! panel always receives the pixels that were just drawn;
//! [`FrameBuffer::swap`] exchanges the roles afterwards so subsequent
//! drawing reuses the previously displayed buffer.
//!
//! The dirty rectangle is the minimal axis-aligned bounding box of every
//! pixel written since it was last cleared; the refresh path uses it to
//! keep incremental updates proportional to the changed area.

use crate::error::{Error, Result};

/// Bounding box of pending changes. `x_min == -1` is the empty sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    x_min: i32,
    y_min: i32,
    x_max: i32,
    y_max: i32,
}

impl DirtyRect {
    pub const fn empty() -> Self {
        Self {
            x_min: -1,
            y_min: -1,
            x_max: -1,
            y_max: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_min == -1
    }

    /// Expand to the union with `(x, y, w, h)`. The first mark after a
    /// clear sets the rectangle exactly.
    pub fn mark(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        let x_max = x + width - 1;
        let y_max = y + height - 1;

        if self.is_empty() {
            *self = Self {
                x_min: x,
                y_min: y,
                x_max,
                y_max,
            };
            return;
        }
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x_max);
        self.y_max = self.y_max.max(y_max);
    }

    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Bounds as `(x, y, width, height)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        if self.is_empty() {
            None
        } else {
            Some((
                self.x_min,
                self.y_min,
                self.x_max - self.x_min + 1,
                self.y_max - self.y_min + 1,
            ))
        }
    }
}

/// Front/back RGB565 pixel store for one panel.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    front: Vec<u16>,
    back: Option<Vec<u16>>,
    dirty: DirtyRect,
}

impl FrameBuffer {
    /// Allocate buffers for `width x height` pixels. Allocation failure
    /// surfaces as [`Error::Memory`] rather than aborting.
    pub fn new(width: u32, height: u32, double_buffer: bool) -> Result<Self> {
        let len = (width as usize) * (height as usize);
        let front = alloc_pixels(len)?;
        let back = if double_buffer {
            Some(alloc_pixels(len)?)
        } else {
            None
        };
        Ok(Self {
            width,
            height,
            front,
            back,
            dirty: DirtyRect::empty(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_double_buffered(&self) -> bool {
        self.back.is_some()
    }

    /// Swap logical dimensions after a rotation change. 320x480 and
    /// 480x320 share the same allocation, so no pixels move; contents
    /// are stale until the caller redraws.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        debug_assert_eq!(
            (width as usize) * (height as usize),
            self.front.len(),
            "rotation must preserve the pixel count"
        );
        self.width = width;
        self.height = height;
        self.dirty.clear();
    }

    /// Buffer that drawing operations mutate.
    pub fn draw_target(&mut self) -> &mut [u16] {
        match self.back.as_mut() {
            Some(back) => back,
            None => &mut self.front,
        }
    }

    /// Read-only view of the draw target.
    pub fn draw_source(&self) -> &[u16] {
        match self.back.as_ref() {
            Some(back) => back,
            None => &self.front,
        }
    }

    /// Exchange front/back roles after a refresh. No-op in single-buffer
    /// mode.
    pub fn swap(&mut self) {
        if let Some(back) = self.back.as_mut() {
            core::mem::swap(&mut self.front, back);
        }
    }

    /// Write one pixel without bounds checking beyond debug assertions;
    /// callers validate coordinates. Marks a 1x1 dirty rectangle.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u16) {
        debug_assert!(x >= 0 && (x as u32) < self.width);
        debug_assert!(y >= 0 && (y as u32) < self.height);
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.draw_target()[idx] = color;
        self.dirty.mark(x, y, 1, 1);
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> u16 {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.draw_source()[idx]
    }

    /// Fill a pre-clipped rectangle. Marks it dirty.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: u16) {
        let stride = self.width as usize;
        let target = self.draw_target();
        for row in 0..height {
            let start = (y + row) as usize * stride + x as usize;
            target[start..start + width as usize].fill(color);
        }
        self.dirty.mark(x, y, width, height);
    }

    /// Row-wise copy of `src` (tightly packed `src_stride` pixels per
    /// row, starting at `src_offset`) into a pre-clipped destination
    /// rectangle. Marks it dirty.
    pub fn copy_rows(
        &mut self,
        src: &[u16],
        src_stride: usize,
        src_offset: (usize, usize),
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) {
        let stride = self.width as usize;
        let target = self.draw_target();
        for row in 0..height as usize {
            let s = (src_offset.1 + row) * src_stride + src_offset.0;
            let d = (y as usize + row) * stride + x as usize;
            target[d..d + width as usize].copy_from_slice(&src[s..s + width as usize]);
        }
        self.dirty.mark(x, y, width, height);
    }

    pub fn fill(&mut self, color: u16) {
        self.draw_target().fill(color);
        let (w, h) = (self.width as i32, self.height as i32);
        self.dirty.mark(0, 0, w, h);
    }

    pub fn dirty(&self) -> &DirtyRect {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

fn alloc_pixels(len: usize) -> Result<Vec<u16>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::Memory)?;
    buf.resize(len, 0);
    Ok(buf)
}
