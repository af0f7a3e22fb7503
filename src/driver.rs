//! The owned driver context and the scan controller.
//!
//! [`MatrixDriver`] bundles the framebuffer, the bitplane set and the
//! transport into one object passed around by reference, instead of the
//! free-standing globals a C driver would use. Single-instance semantics
//! are preserved by construction (the transport claims the hardware once),
//! while tests can instantiate isolated drivers over software transports.
//!
//! # Scan sequence
//!
//! [`show_frame`](MatrixDriver::show_frame) re-encodes the bitplanes and
//! then walks planes (outer) × rows (inner). For every pair the order is
//! fixed:
//!
//! 1. blank the output — address and data must never change while lit
//! 2. set the row address
//! 3. DMA the row block to the shift peripheral and block until done
//! 4. pulse the latch
//! 5. enable the output for `2^plane` µs, then blank again
//!
//! One call scans the panel exactly once and returns; continuous display is
//! the caller invoking it in a loop. The call blocks for the whole refresh,
//! bounded by `PLANES × NROWS × (overhead + 2^plane µs)`.

use embedded_graphics::prelude::Point;
use fugit::MicrosDurationU32;

use crate::bitplane::BitPlanes;
use crate::framebuffer::FrameBuffer;
use crate::transport::PanelTransport;
use crate::{plane_hold_micros, Color};

/// HUB75 matrix driver: framebuffer, BCM planes and transport in one owned
/// context.
///
/// # Type Parameters
/// - `T`: The [`PanelTransport`] implementation
/// - `ROWS`: Total number of rows in the panel
/// - `COLS`: Number of columns in the panel
/// - `NROWS`: Number of addressable row pairs (use [`compute_rows`](crate::compute_rows))
/// - `PAIRS`: Packed words per row (use [`compute_pairs`](crate::compute_pairs))
/// - `PLANES`: Number of bitplanes (8 for full colour depth)
///
/// # Example
/// ```rust
/// use embedded_graphics::prelude::*;
/// use fugit::MicrosDurationU32;
/// use hub75_bcm::{Color, MatrixDriver, PanelTransport};
///
/// // A do-nothing transport; a real application would use
/// // `hub75_bcm::rp2040::Rp2040Transport` instead.
/// struct NullTransport;
/// impl PanelTransport for NullTransport {
///     type Error = core::convert::Infallible;
///     fn configure(&mut self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///     fn set_row_address(&mut self, _row: u8) {}
///     fn pulse_latch(&mut self) {}
///     fn set_output_enable(&mut self, _enabled: bool) {}
///     fn start_transfer(&mut self, _words: &[u16]) {}
///     fn wait_transfer(&mut self) {}
///     fn hold(&mut self, _duration: MicrosDurationU32) {}
/// }
///
/// let mut driver = MatrixDriver::<_, 32, 64, 16, 32, 8>::new(NullTransport).unwrap();
///
/// // Fill the panel with a colour gradient and display it
/// for y in 0..32i32 {
///     for x in 0..64i32 {
///         let r = (x * 255 / 63) as u8;
///         let g = (y * 255 / 31) as u8;
///         driver.set_pixel(Point::new(x, y), Color::new(r, g, 128));
///     }
/// }
/// driver.show_frame();
/// ```
pub struct MatrixDriver<
    T,
    const ROWS: usize,
    const COLS: usize,
    const NROWS: usize,
    const PAIRS: usize,
    const PLANES: usize,
> {
    framebuffer: FrameBuffer<ROWS, COLS>,
    bitplanes: BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>,
    transport: T,
}

impl<
        T: PanelTransport,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > MatrixDriver<T, ROWS, COLS, NROWS, PAIRS, PLANES>
{
    /// Create the driver and configure the transport.
    ///
    /// The transport's `configure` is called exactly once, here.
    ///
    /// # Errors
    /// Propagates the transport's configuration error; without a claimable
    /// shift peripheral and DMA channel the panel cannot function.
    pub fn new(mut transport: T) -> Result<Self, T::Error> {
        transport.configure()?;
        Ok(Self {
            framebuffer: FrameBuffer::new(),
            bitplanes: BitPlanes::new(),
            transport,
        })
    }

    /// Set every framebuffer pixel to black.
    ///
    /// Takes effect on the panel at the next [`show_frame`](Self::show_frame).
    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    /// Set a pixel in the framebuffer.
    ///
    /// Out-of-range coordinates are silently ignored; see
    /// [`FrameBuffer::set_pixel`].
    pub fn set_pixel(&mut self, p: Point, color: Color) {
        self.framebuffer.set_pixel(p, color);
    }

    /// Scan the current framebuffer out to the panel once.
    ///
    /// Rebuilds all bitplanes from the framebuffer, then runs the full
    /// planes × rows scan. Blocks until the refresh is complete.
    pub fn show_frame(&mut self) {
        self.bitplanes.encode(&self.framebuffer);

        for plane in 0..PLANES {
            for row in 0..NROWS {
                // Blank before any address or data change; the panel must
                // never show a transition state.
                self.transport.set_output_enable(false);
                self.transport.set_row_address(row as u8);
                self.transport
                    .start_transfer(self.bitplanes.row_words(plane, row));
                self.transport.wait_transfer();
                self.transport.pulse_latch();
                self.transport.set_output_enable(true);
                self.transport
                    .hold(MicrosDurationU32::micros(plane_hold_micros(plane)));
                self.transport.set_output_enable(false);
            }
        }
    }

    /// Access the transport, e.g. to service its interrupt hook.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<
        T,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > embedded_graphics::prelude::OriginDimensions
    for MatrixDriver<T, ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn size(&self) -> embedded_graphics::prelude::Size {
        embedded_graphics::prelude::Size::new(COLS as u32, ROWS as u32)
    }
}

impl<
        T: PanelTransport,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > embedded_graphics::draw_target::DrawTarget
    for MatrixDriver<T, ROWS, COLS, NROWS, PAIRS, PLANES>
{
    type Color = Color;

    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }
}

impl<
        T,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > core::fmt::Debug for MatrixDriver<T, ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MatrixDriver")
            .field("rows", &ROWS)
            .field("cols", &COLS)
            .field("planes", &PLANES)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<
        T,
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > defmt::Format for MatrixDriver<T, ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "MatrixDriver<{}, {}, {}>", ROWS, COLS, PLANES);
    }
}
