//! RP2040 transfer engine: PIO shift-out plus DREQ-paced DMA.
//!
//! The six colour pins and the clock are driven by a PIO state machine so
//! the CPU never clocks individual bits. A DMA channel feeds the state
//! machine's TX FIFO with the packed row words, paced by the FIFO's data
//! request so it only advances when the previous word has been consumed.
//! The control lines (row address, latch, output enable) are ordinary GPIO
//! outputs toggled by the scan controller between transfers.
//!
//! # Wiring requirements
//!
//! - The six data pins (R1, G1, B1, R2, G2, B2) must be consecutive GPIOs
//!   starting at `data_pin_base`, in that order, and must be handed to the
//!   PIO block (`pin.into_function::<FunctionPio0>()`) by the caller.
//! - The clock pin is side-set by the same state machine and must also be
//!   in PIO function mode.
//! - Address, latch and OE pins are plain SIO outputs; any GPIOs work.
//!
//! # DMA channel
//!
//! The transport takes ownership of the `DMA` peripheral block and uses
//! channel 0. Exclusive ownership of the block makes a claim conflict a
//! compile-time error rather than a runtime one. The channel's completion
//! interrupt is enabled; [`Rp2040Transport::on_dma_irq`] clears the flag
//! and nothing else — transfer completion is detected by polling the
//! channel BUSY bit, not by the interrupt.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use fugit::MicrosDurationU32;
use pio_proc::pio_asm;
use rp2040_hal::pac::DMA;
use rp2040_hal::pio::{
    Buffers, PIOBuilder, PIOExt, PinDir, Running, ShiftDirection, StateMachine,
    StateMachineIndex, Tx, UninitStateMachine, PIO,
};

use crate::transport::PanelTransport;

/// The GPIO control lines the scan controller toggles between transfers.
///
/// Implemented for a 7-tuple of `OutputPin`s in the order
/// `(a, b, c, d, e, lat, oe)`. Panels with fewer than five address lines
/// leave the upper pins unconnected on the connector; the driver still
/// drives all five.
pub trait ControlPins {
    /// Row address bit 0
    type A: OutputPin;
    /// Row address bit 1
    type B: OutputPin;
    /// Row address bit 2
    type C: OutputPin;
    /// Row address bit 3
    type D: OutputPin;
    /// Row address bit 4
    type E: OutputPin;
    /// Latch line
    type Lat: OutputPin;
    /// Output-enable line (active low)
    type Oe: OutputPin;

    /// Row address bit 0
    fn a(&mut self) -> &mut Self::A;
    /// Row address bit 1
    fn b(&mut self) -> &mut Self::B;
    /// Row address bit 2
    fn c(&mut self) -> &mut Self::C;
    /// Row address bit 3
    fn d(&mut self) -> &mut Self::D;
    /// Row address bit 4
    fn e(&mut self) -> &mut Self::E;
    /// Latch line
    fn lat(&mut self) -> &mut Self::Lat;
    /// Output-enable line (active low)
    fn oe(&mut self) -> &mut Self::Oe;
}

impl<A, B, C, D, E, Lat, Oe> ControlPins for (A, B, C, D, E, Lat, Oe)
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
    E: OutputPin,
    Lat: OutputPin,
    Oe: OutputPin,
{
    type A = A;
    type B = B;
    type C = C;
    type D = D;
    type E = E;
    type Lat = Lat;
    type Oe = Oe;

    fn a(&mut self) -> &mut A {
        &mut self.0
    }
    fn b(&mut self) -> &mut B {
        &mut self.1
    }
    fn c(&mut self) -> &mut C {
        &mut self.2
    }
    fn d(&mut self) -> &mut D {
        &mut self.3
    }
    fn e(&mut self) -> &mut E {
        &mut self.4
    }
    fn lat(&mut self) -> &mut Lat {
        &mut self.5
    }
    fn oe(&mut self) -> &mut Oe {
        &mut self.6
    }
}

/// Errors raised while claiming and programming the peripherals.
///
/// All of these are fatal: without a shift peripheral and DMA channel the
/// panel cannot be driven at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The PIO instruction memory had no room for the shift program.
    ProgramInstall,
    /// `configure` was called more than once.
    AlreadyConfigured,
}

/// PIO + DMA implementation of [`PanelTransport`].
///
/// # Type Parameters
/// - `P`: The PIO block (`PIO0` or `PIO1`)
/// - `SM`: The state machine index within the block
/// - `PINS`: The [`ControlPins`] implementation
/// - `DELAY`: Microsecond delay source for latch and output-enable timing
pub struct Rp2040Transport<P, SM, PINS, DELAY>
where
    P: PIOExt,
    SM: StateMachineIndex,
{
    pio: PIO<P>,
    uninit_sm: Option<UninitStateMachine<(P, SM)>>,
    running_sm: Option<StateMachine<(P, SM), Running>>,
    tx: Option<Tx<(P, SM)>>,
    dma: DMA,
    pins: PINS,
    delay: DELAY,
    data_pin_base: u8,
    clock_pin: u8,
}

impl<P, SM, PINS, DELAY> Rp2040Transport<P, SM, PINS, DELAY>
where
    P: PIOExt,
    SM: StateMachineIndex,
    PINS: ControlPins,
    DELAY: DelayNs,
{
    /// Bundle the peripherals; nothing is programmed until the driver calls
    /// `configure`.
    ///
    /// `pio` and `sm` come from `P::split`; `dma` is the PAC `DMA` block,
    /// owned exclusively by the transport from here on.
    pub fn new(
        pio: PIO<P>,
        sm: UninitStateMachine<(P, SM)>,
        dma: DMA,
        pins: PINS,
        delay: DELAY,
        data_pin_base: u8,
        clock_pin: u8,
    ) -> Self {
        Self {
            pio,
            uninit_sm: Some(sm),
            running_sm: None,
            tx: None,
            dma,
            pins,
            delay,
            data_pin_base,
            clock_pin,
        }
    }

    /// Clear the channel's completion interrupt flag.
    ///
    /// Call this from the application's `DMA_IRQ_0` handler. It is the
    /// handler's only duty; the scan loop waits on the channel BUSY bit and
    /// does not depend on the interrupt.
    pub fn on_dma_irq(&mut self) {
        self.dma.ints0().write(|w| unsafe { w.bits(1) });
    }
}

impl<P, SM, PINS, DELAY> PanelTransport for Rp2040Transport<P, SM, PINS, DELAY>
where
    P: PIOExt,
    SM: StateMachineIndex,
    PINS: ControlPins,
    DELAY: DelayNs,
{
    type Error = Error;

    fn configure(&mut self) -> Result<(), Error> {
        let sm = self.uninit_sm.take().ok_or(Error::AlreadyConfigured)?;

        // Shift one 6-bit column word per clock edge. Each FIFO word holds
        // the two column slots of a PairWord, so the OSR refills every 12
        // bits.
        let program = pio_asm!(
            ".side_set 1",
            ".wrap_target",
            "out pins, 6    side 0b0",
            "nop            side 0b1",
            ".wrap",
        );
        let installed = self
            .pio
            .install(&program.program)
            .map_err(|_| Error::ProgramInstall)?;

        let (mut sm, _rx, tx) = PIOBuilder::from_installed_program(installed)
            .out_pins(self.data_pin_base, 6)
            .side_set_pin_base(self.clock_pin)
            .out_shift_direction(ShiftDirection::Right)
            .autopull(true)
            .pull_threshold(12)
            .buffers(Buffers::OnlyTx)
            .clock_divisor_fixed_point(1, 0)
            .build(sm);
        sm.set_pindirs(
            (self.data_pin_base..self.data_pin_base + 6).map(|pin| (pin, PinDir::Output)),
        );
        sm.set_pindirs([(self.clock_pin, PinDir::Output)]);

        // Channel 0: halfword transfers, incrementing reads from the row
        // block, fixed writes into the state machine's TX FIFO, paced by
        // its DREQ.
        self.dma.ch(0).ch_al1_ctrl().write(|w| unsafe {
            w.incr_read()
                .bit(true)
                .incr_write()
                .bit(false)
                .data_size()
                .size_halfword()
                .treq_sel()
                .bits(tx.dreq_value())
                // Chaining to itself leaves chaining disabled
                .chain_to()
                .bits(0)
                .en()
                .bit(true)
        });
        self.dma
            .ch(0)
            .ch_write_addr()
            .write(|w| unsafe { w.bits(tx.fifo_address() as u32) });
        // Completion interrupt for channel 0; see `on_dma_irq`
        self.dma.inte0().modify(|r, w| unsafe { w.bits(r.bits() | 1) });

        // Blank the panel before the first latch
        self.pins.oe().set_high().ok();
        self.pins.lat().set_low().ok();

        self.running_sm = Some(sm.start());
        self.tx = Some(tx);
        Ok(())
    }

    fn set_row_address(&mut self, row: u8) {
        self.pins.a().set_state((row & 0x01 != 0).into()).ok();
        self.pins.b().set_state((row & 0x02 != 0).into()).ok();
        self.pins.c().set_state((row & 0x04 != 0).into()).ok();
        self.pins.d().set_state((row & 0x08 != 0).into()).ok();
        self.pins.e().set_state((row & 0x10 != 0).into()).ok();
    }

    fn pulse_latch(&mut self) {
        self.pins.lat().set_high().ok();
        self.delay.delay_us(1);
        self.pins.lat().set_low().ok();
    }

    fn set_output_enable(&mut self, enabled: bool) {
        // OE is active low
        if enabled {
            self.pins.oe().set_low().ok();
        } else {
            self.pins.oe().set_high().ok();
        }
    }

    fn start_transfer(&mut self, words: &[u16]) {
        self.dma
            .ch(0)
            .ch_trans_count()
            .write(|w| unsafe { w.bits(words.len() as u32) });
        // Writing the read address through the trigger alias starts the
        // transfer.
        self.dma
            .ch(0)
            .ch_al3_read_addr_trig()
            .write(|w| unsafe { w.bits(words.as_ptr() as u32) });
    }

    fn wait_transfer(&mut self) {
        // Reading CTRL does not retrigger; only writes do.
        while self.dma.ch(0).ch_ctrl_trig().read().busy().bit_is_set() {
            core::hint::spin_loop();
        }
    }

    fn hold(&mut self, duration: MicrosDurationU32) {
        self.delay.delay_us(duration.to_micros());
    }
}

impl<P, SM, PINS, DELAY> core::fmt::Debug for Rp2040Transport<P, SM, PINS, DELAY>
where
    P: PIOExt,
    SM: StateMachineIndex,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rp2040Transport")
            .field("data_pin_base", &self.data_pin_base)
            .field("clock_pin", &self.clock_pin)
            .field("configured", &self.running_sm.is_some())
            .finish()
    }
}
