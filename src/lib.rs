//! Binary code modulation driver for HUB75 RGB LED matrix panels.
//!
//! ## How HUB75 panels work
//!
//! A HUB75 panel is not a random-access display: it is a long daisy-chained
//! shift register scanned one row pair at a time.
//!
//! ### Signal names
//! - **R1 G1 B1 / R2 G2 B2** – Serial colour data for the upper and lower halves of the panel
//! - **CLK** – Shift clock; every rising edge pushes the six colour bits one column along
//! - **LAT** – Latch; commits the shifted row data into the LED output drivers
//! - **OE** – Output-Enable (active LOW): LEDs are lit while OE is LOW and blanked while HIGH
//! - **A B C D (E)** – Row-address lines selecting which row pair is active
//!
//! The panel drives its top and bottom halves in parallel: the address lines
//! select one of `ROWS / 2` physical rows, and the six data lines carry the
//! colour bits for the selected row *and* the row `ROWS / 2` below it at the
//! same time.
//!
//! ### Brightness and colour depth (Binary Code Modulation)
//!
//! Each LED is only ever on or off, so colour depth is synthesized in time.
//! The framebuffer is decomposed into [`BITPLANES`] single-bit "bitplanes",
//! one per binary weight of the 8-bit channel value. Plane `b` is displayed
//! for `2^b` microseconds, so the time-averaged brightness of a channel
//! equals its stored intensity. See
//! [Batsocks – LED dimming using Binary Code Modulation](https://www.batsocks.co.uk/readme/art_bcm_1.htm)
//! for a deeper explanation.
//!
//! ## Architecture
//!
//! The crate is split along the data path:
//!
//! 1. [`framebuffer::FrameBuffer`] – the logical image, one [`Color`] per
//!    pixel, drawable with `embedded-graphics`.
//! 2. [`bitplane::BitPlanes`] – the hardware-packed BCM planes, rebuilt from
//!    the framebuffer on every refresh and handed to DMA via the
//!    `embedded-dma` `ReadBuffer` trait.
//! 3. [`transport::PanelTransport`] – the capability seam over the shift
//!    peripheral, DMA channel, and control lines. Scan logic is written
//!    against this trait so it can be tested with a software transport.
//! 4. [`driver::MatrixDriver`] – owns all of the above and runs the
//!    blank → address → transfer → latch → timed-enable scan sequence.
//!
//! The reference transport (`rp2040::Rp2040Transport`, feature `rp2040`)
//! uses an RP2040 PIO state machine to clock the six data pins and a DMA
//! channel paced by the PIO FIFO, so the CPU never touches individual pixel
//! words during scan-out.
//!
//! ## Available feature flags
//!
//! ### `rp2040` Feature
//! Enables the PIO + DMA transport for the RP2040. Pulls in `rp2040-hal`,
//! `pio`, `pio-proc` and `embedded-hal`.
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for the driver types so they can be emitted
//! with the `defmt` logging framework. No functional changes; purely adds
//! trait impls.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use embedded_graphics::pixelcolor::Rgb888;

pub mod bitplane;
pub mod driver;
pub mod framebuffer;
#[cfg(feature = "rp2040")]
pub mod rp2040;
pub mod transport;

pub use driver::MatrixDriver;
pub use transport::PanelTransport;

/// Color type used in the framebuffer
pub type Color = Rgb888;

/// Number of bitplanes for full 8-bit-per-channel colour depth.
pub const BITPLANES: usize = 8;

/// Computes the number of physical scan rows from the panel height.
///
/// HUB75 panels drive the top and bottom halves in parallel, so a panel
/// with `rows` rows of pixels has `rows / 2` addressable rows.
///
/// # Arguments
///
/// * `rows` - Total number of rows in the display
///
/// # Returns
///
/// Number of addressable row pairs
#[must_use]
pub const fn compute_rows(rows: usize) -> usize {
    rows / 2
}

/// Computes the number of packed column-pair words per scan row.
///
/// Each 16-bit word carries the colour bits of two adjacent columns, so a
/// panel `cols` wide needs `cols / 2` words per row per bitplane.
///
/// # Arguments
///
/// * `cols` - Number of columns in the display
///
/// # Returns
///
/// Number of packed words per row
#[must_use]
pub const fn compute_pairs(cols: usize) -> usize {
    cols / 2
}

/// Output-enable hold time for a bitplane, in microseconds.
///
/// This is the core of binary code modulation: plane `plane` is shown for
/// `2^plane` µs, so the total on-time of a channel over all planes equals
/// its 8-bit intensity value.
#[must_use]
pub const fn plane_hold_micros(plane: usize) -> u32 {
    1 << plane
}
