//! Render-backend selection.
//!
//! The SPI path is the only working backend; it is authoritative for
//! everything the crate does. A DRM/KMS backend was planned for
//! GPU-composited output but the panel has no DRM connector on the SPI
//! bus, so the type exists only to report that cleanly and let callers
//! fall back.

use log::warn;

use crate::error::{Error, Result};

/// Which render path a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderBackend {
    /// Direct SPI streaming of the framebuffer. Always available.
    #[default]
    Spi,
    /// DRM/KMS with GPU composition. Not implemented.
    Drm,
}

/// Resolve a requested backend to one that works, logging the fallback.
pub fn select_backend(requested: RenderBackend) -> RenderBackend {
    match requested {
        RenderBackend::Spi => RenderBackend::Spi,
        RenderBackend::Drm => {
            warn!("DRM backend not supported on the SPI panel, falling back to SPI");
            RenderBackend::Spi
        }
    }
}

/// Placeholder for the DRM/KMS render path. Every operation reports
/// [`Error::NotSupported`]; nothing is probed or opened.
#[derive(Debug, Default)]
pub struct DrmBackend;

impl DrmBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn initialize(&mut self) -> Result<()> {
        Err(Error::NotSupported)
    }

    pub fn setup_display(&mut self, _width: u32, _height: u32) -> Result<()> {
        Err(Error::NotSupported)
    }

    pub fn create_framebuffer(&mut self) -> Result<()> {
        Err(Error::NotSupported)
    }

    pub fn present_buffer(&mut self, _pixels: &[u16]) -> Result<()> {
        Err(Error::NotSupported)
    }

    pub fn render_with_gpu(&mut self) -> Result<()> {
        Err(Error::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drm_backend_supports_nothing() {
        let mut drm = DrmBackend::new();
        assert!(matches!(drm.initialize(), Err(Error::NotSupported)));
        assert!(matches!(drm.setup_display(320, 480), Err(Error::NotSupported)));
        assert!(matches!(drm.create_framebuffer(), Err(Error::NotSupported)));
        assert!(matches!(drm.present_buffer(&[]), Err(Error::NotSupported)));
        assert!(matches!(drm.render_with_gpu(), Err(Error::NotSupported)));
    }

    #[test]
    fn drm_request_falls_back_to_spi() {
        assert_eq!(select_backend(RenderBackend::Drm), RenderBackend::Spi);
        assert_eq!(select_backend(RenderBackend::Spi), RenderBackend::Spi);
    }
}
