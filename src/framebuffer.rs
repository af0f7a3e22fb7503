//! Logical framebuffer for the panel.
//!
//! This holds the image the application draws into: one [`Color`] per pixel,
//! `ROWS` × `COLS`. It knows nothing about bitplanes or hardware word
//! packing; the [`bitplane`](crate::bitplane) encoder reads it wholesale on
//! every refresh.
//!
//! # Bounds contract
//! `set_pixel` silently ignores any coordinate outside the panel, including
//! negative ones. Generator code (scrolling text, animations) relies on
//! being able to pass unclamped coordinates without crashing, so this is a
//! guarantee, not a convenience.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::RgbColor;
use embedded_graphics::prelude::Point;

use super::Color;

/// In-memory image of the panel, one `Color` per pixel.
///
/// # Type Parameters
/// - `ROWS`: Total number of rows in the panel
/// - `COLS`: Number of columns in the panel
///
/// # Example
/// ```rust
/// use embedded_graphics::prelude::*;
/// use hub75_bcm::framebuffer::FrameBuffer;
/// use hub75_bcm::Color;
///
/// let mut fb = FrameBuffer::<32, 64>::new();
/// fb.set_pixel(Point::new(10, 10), Color::RED);
/// fb.clear();
/// ```
#[derive(Clone, Copy)]
pub struct FrameBuffer<const ROWS: usize, const COLS: usize> {
    pixels: [[Color; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> FrameBuffer<ROWS, COLS> {
    /// Create a new framebuffer with every pixel black.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pixels: [[Color::BLACK; COLS]; ROWS],
        }
    }

    /// Set every pixel to black.
    pub fn clear(&mut self) {
        for row in &mut self.pixels {
            row.fill(Color::BLACK);
        }
    }

    /// Set a pixel in the framebuffer.
    ///
    /// Coordinates outside the panel (negative or past either dimension)
    /// are silently ignored.
    pub fn set_pixel(&mut self, p: Point, color: Color) {
        if p.x < 0 || p.y < 0 {
            return;
        }
        self.set_pixel_internal(p.x as usize, p.y as usize, color);
    }

    fn set_pixel_internal(&mut self, x: usize, y: usize, color: Color) {
        if x >= COLS || y >= ROWS {
            return;
        }
        self.pixels[y][x] = color;
    }

    /// Raw pixel access for the bitplane encoder.
    ///
    /// Callers must pass in-bounds coordinates.
    pub(crate) fn pixel(&self, x: usize, y: usize) -> Color {
        self.pixels[y][x]
    }
}

impl<const ROWS: usize, const COLS: usize> Default for FrameBuffer<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROWS: usize, const COLS: usize> embedded_graphics::prelude::OriginDimensions
    for FrameBuffer<ROWS, COLS>
{
    fn size(&self) -> embedded_graphics::prelude::Size {
        embedded_graphics::prelude::Size::new(COLS as u32, ROWS as u32)
    }
}

impl<const ROWS: usize, const COLS: usize> embedded_graphics::draw_target::DrawTarget
    for FrameBuffer<ROWS, COLS>
{
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for pixel in pixels {
            self.set_pixel(pixel.0, pixel.1);
        }
        Ok(())
    }
}

impl<const ROWS: usize, const COLS: usize> core::fmt::Debug for FrameBuffer<ROWS, COLS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("rows", &ROWS)
            .field("cols", &COLS)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<const ROWS: usize, const COLS: usize> defmt::Format for FrameBuffer<ROWS, COLS> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FrameBuffer<{}, {}>", ROWS, COLS);
    }
}
