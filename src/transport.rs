//! Capability seam between the scan controller and the panel hardware.
//!
//! The scan controller only needs a handful of primitives: claim and set up
//! the shift peripheral and DMA channel once, move a packed row block, and
//! sequence the row-address, latch and output-enable lines with explicit
//! hold times. Putting those behind a trait keeps the encoder and scan
//! logic testable against a software transport that merely records calls,
//! while the `rp2040` feature provides the real PIO + DMA implementation.

use fugit::MicrosDurationU32;

/// Hardware operations required to scan a frame out to the panel.
///
/// Implementations own the shift peripheral, the DMA channel and the
/// control pins for the lifetime of the process; nothing is ever released.
///
/// # Call protocol
///
/// [`configure`](Self::configure) is called exactly once, before any other
/// method. During scan-out the driver issues, per (bitplane, row) pair and
/// strictly in this order:
///
/// 1. `set_output_enable(false)` — blank before touching address or data
/// 2. `set_row_address(row)`
/// 3. `start_transfer(words)` then `wait_transfer()` — blocking handoff
/// 4. `pulse_latch()`
/// 5. `set_output_enable(true)`, `hold(2^plane µs)`, `set_output_enable(false)`
pub trait PanelTransport {
    /// Error produced when claiming or configuring the peripheral fails.
    ///
    /// This is the only fallible path: a panel with no claimable shift
    /// peripheral or DMA channel cannot function at all.
    type Error;

    /// Claim and configure the shift peripheral, DMA channel and control
    /// pins. Called exactly once.
    ///
    /// # Errors
    /// Returns an error if the peripheral or DMA channel cannot be claimed
    /// or programmed; the driver treats this as fatal.
    fn configure(&mut self) -> Result<(), Self::Error>;

    /// Drive the row-address lines with the binary encoding of `row`.
    ///
    /// Five address lines are supported; panels with fewer simply leave the
    /// upper lines unconnected.
    fn set_row_address(&mut self, row: u8);

    /// Pulse the latch line to commit the shifted row into the panel's
    /// output drivers.
    fn pulse_latch(&mut self);

    /// Light (`true`) or blank (`false`) the currently latched row.
    ///
    /// Implementations translate to the panel's active-low OE line.
    fn set_output_enable(&mut self, enabled: bool);

    /// Begin moving one packed row block to the shift peripheral.
    ///
    /// The block must remain untouched until [`wait_transfer`](Self::wait_transfer)
    /// returns; the driver guarantees this by not re-encoding mid-scan.
    fn start_transfer(&mut self, words: &[u16]);

    /// Block until the transfer started by [`start_transfer`](Self::start_transfer)
    /// has fully drained.
    ///
    /// There is no timeout: a stalled peripheral stalls the scan loop. With
    /// fixed-rate shift hardware this cannot happen in practice.
    fn wait_transfer(&mut self);

    /// Busy-hold for `duration` with the output state unchanged.
    ///
    /// Taking the duration as an explicit parameter lets tests substitute a
    /// virtual clock for the real microsecond delay.
    fn hold(&mut self, duration: MicrosDurationU32);
}
