//! The reusable drawing surface pages are rendered into.
//!
//! A [`DrawingSurface`] is a single exclusive resource. Renders borrow it
//! through a [`SurfaceLease`], which requires `&mut` access to the surface,
//! so two renders can never target the same surface at once. Dropping the
//! lease wipes the pixels back to opaque white, also when the render failed.

use std::ops::{Deref, DerefMut};

use image::{Rgba, RgbaImage};

/// Background every render starts from.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Counters of surface usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// Number of leases handed out.
    pub leases: u64,
    /// Number of times the backing buffer was (re)allocated.
    pub allocations: u64,
    /// Number of times the backing buffer was released.
    pub reclamations: u64,
}

/// A pixel buffer reused across every page of one import.
#[derive(Debug)]
pub struct DrawingSurface {
    buffer: RgbaImage,
    stats: SurfaceStats,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingSurface {
    /// Create an empty surface. No memory is allocated until the first lease.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: RgbaImage::new(0, 0),
            stats: SurfaceStats::default(),
        }
    }

    /// Borrow the surface sized to `width × height`, cleared to white.
    pub fn acquire(&mut self, width: u32, height: u32) -> SurfaceLease<'_> {
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::from_pixel(width, height, BACKGROUND);
            self.stats.allocations += 1;
        }
        self.stats.leases += 1;
        SurfaceLease { surface: self }
    }

    /// Release the backing buffer. Advisory: the next lease reallocates.
    pub fn reclaim(&mut self) {
        if self.buffer.width() > 0 || self.buffer.height() > 0 {
            self.buffer = RgbaImage::new(0, 0);
            self.stats.reclamations += 1;
            tracing::trace!("Drawing surface reclaimed");
        }
    }

    /// Current pixel dimensions of the backing buffer.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Usage counters.
    #[must_use]
    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }
}

/// Scoped exclusive access to a [`DrawingSurface`].
#[derive(Debug)]
pub struct SurfaceLease<'a> {
    surface: &'a mut DrawingSurface,
}

impl Deref for SurfaceLease<'_> {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        &self.surface.buffer
    }
}

impl DerefMut for SurfaceLease<'_> {
    fn deref_mut(&mut self) -> &mut RgbaImage {
        &mut self.surface.buffer
    }
}

impl Drop for SurfaceLease<'_> {
    fn drop(&mut self) {
        for pixel in self.surface.buffer.pixels_mut() {
            *pixel = BACKGROUND;
        }
    }
}
