//! Binary code modulation bitplanes in the panel's wire format.
//!
//! The 24-bit-per-pixel [`FrameBuffer`] cannot be clocked into the panel
//! directly: the shift registers accept one bit per colour channel, for two
//! panel halves at once. This module decomposes the framebuffer into
//! `PLANES` single-bit layers ("bitplanes"), one per binary weight of the
//! 8-bit channel value, packed so that a DMA engine can stream them to the
//! shift peripheral without any per-word CPU work.
//!
//! # Word layout
//!
//! Each 16-bit word carries the colour bits of two adjacent columns for one
//! bitplane. The layout is a hardware contract — it must match the order in
//! which the shift peripheral presents bits on the six data pins:
//!
//! - Bit 0: Red, top half, even column
//! - Bit 1: Green, top half, even column
//! - Bit 2: Blue, top half, even column
//! - Bit 3: Red, bottom half, even column
//! - Bit 4: Green, bottom half, even column
//! - Bit 5: Blue, bottom half, even column
//! - Bits 6–11: the same six channels for the odd column
//! - Bits 12–15: unused
//!
//! # Rebuild semantics
//!
//! [`BitPlanes::encode`] fully overwrites every plane from the framebuffer;
//! there is no incremental update. The cost is O(`ROWS` × `COLS` ×
//! `PLANES`), paid once per displayed frame.

use bitfield::bitfield;
use embedded_dma::ReadBuffer;

use crate::framebuffer::FrameBuffer;
use embedded_graphics::pixelcolor::RgbColor;

bitfield! {
    /// 16-bit word holding one bitplane's colour bits for two adjacent
    /// columns, top and bottom panel halves.
    ///
    /// The bit positions mirror the shift peripheral's output pin order
    /// (R1, G1, B1, R2, G2, B2); see the module docs for the full layout.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[repr(transparent)]
    struct PairWord(u16);
    impl Debug;
    pub red1_even, set_red1_even: 0;
    pub grn1_even, set_grn1_even: 1;
    pub blu1_even, set_blu1_even: 2;
    pub red2_even, set_red2_even: 3;
    pub grn2_even, set_grn2_even: 4;
    pub blu2_even, set_blu2_even: 5;
    pub red1_odd, set_red1_odd: 6;
    pub grn1_odd, set_grn1_odd: 7;
    pub blu1_odd, set_blu1_odd: 8;
    pub red2_odd, set_red2_odd: 9;
    pub grn2_odd, set_grn2_odd: 10;
    pub blu2_odd, set_blu2_odd: 11;
}

impl PairWord {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Set the top-half channels for one column of the pair (0 = even,
    /// 1 = odd).
    fn set_top(&mut self, slot: usize, r: bool, g: bool, b: bool) {
        match slot {
            0 => {
                self.set_red1_even(r);
                self.set_grn1_even(g);
                self.set_blu1_even(b);
            }
            1 => {
                self.set_red1_odd(r);
                self.set_grn1_odd(g);
                self.set_blu1_odd(b);
            }
            _ => unreachable!(),
        }
    }

    /// Set the bottom-half channels for one column of the pair.
    fn set_bottom(&mut self, slot: usize, r: bool, g: bool, b: bool) {
        match slot {
            0 => {
                self.set_red2_even(r);
                self.set_grn2_even(g);
                self.set_blu2_even(b);
            }
            1 => {
                self.set_red2_odd(r);
                self.set_grn2_odd(g);
                self.set_blu2_odd(b);
            }
            _ => unreachable!(),
        }
    }
}

/// Extracts one binary weight of a channel value.
fn channel_bit(value: u8, plane: usize) -> bool {
    (value >> plane) & 1 == 1
}

/// The full set of packed BCM planes for one panel.
///
/// Written only by [`encode`](Self::encode), read only by the transfer
/// engine (per row via [`row_words`](Self::row_words), or wholesale via the
/// `embedded-dma` [`ReadBuffer`] impl).
///
/// # Type Parameters
/// - `ROWS`: Total number of rows in the panel
/// - `COLS`: Number of columns in the panel
/// - `NROWS`: Number of addressable row pairs (use [`compute_rows`](crate::compute_rows))
/// - `PAIRS`: Packed words per row (use [`compute_pairs`](crate::compute_pairs))
/// - `PLANES`: Number of bitplanes (8 for full colour depth)
#[derive(Clone, Copy)]
#[repr(C)]
#[repr(align(4))]
pub struct BitPlanes<
    const ROWS: usize,
    const COLS: usize,
    const NROWS: usize,
    const PAIRS: usize,
    const PLANES: usize,
> {
    planes: [[[u16; PAIRS]; NROWS]; PLANES],
}

impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    /// Create a new, all-zero bitplane set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            planes: [[[0; PAIRS]; NROWS]; PLANES],
        }
    }

    /// Rebuild every plane from the framebuffer.
    ///
    /// For plane `b`, row `y` and column pair `p`, the word collects bit `b`
    /// of the six channel values of the pixels at `(2p, y)`, `(2p + 1, y)`
    /// (top half) and `(2p, y + NROWS)`, `(2p + 1, y + NROWS)` (bottom
    /// half).
    pub fn encode(&mut self, fb: &FrameBuffer<ROWS, COLS>) {
        for plane in 0..PLANES {
            for y in 0..NROWS {
                for pair in 0..PAIRS {
                    let mut word = PairWord::new();
                    for slot in 0..2 {
                        let x = pair * 2 + slot;
                        let top = fb.pixel(x, y);
                        let bottom = fb.pixel(x, y + NROWS);
                        word.set_top(
                            slot,
                            channel_bit(top.r(), plane),
                            channel_bit(top.g(), plane),
                            channel_bit(top.b(), plane),
                        );
                        word.set_bottom(
                            slot,
                            channel_bit(bottom.r(), plane),
                            channel_bit(bottom.g(), plane),
                            channel_bit(bottom.b(), plane),
                        );
                    }
                    self.planes[plane][y][pair] = word.0;
                }
            }
        }
    }

    /// One row's packed word block, ready for a single DMA transfer.
    ///
    /// # Panics
    /// Panics if `plane` or `row` is out of range; the scan controller only
    /// calls this with its own loop indices.
    #[must_use]
    pub fn row_words(&self, plane: usize, row: usize) -> &[u16] {
        &self.planes[plane][row]
    }
}

impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > Default for BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > ReadBuffer for BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    type Word = u16;

    unsafe fn read_buffer(&self) -> (*const u16, usize) {
        let ptr = self.planes.as_ptr().cast::<u16>();
        let len = PLANES * NROWS * PAIRS;
        (ptr, len)
    }
}

unsafe impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > ReadBuffer for &mut BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    type Word = u16;

    unsafe fn read_buffer(&self) -> (*const u16, usize) {
        let ptr = self.planes.as_ptr().cast::<u16>();
        let len = PLANES * NROWS * PAIRS;
        (ptr, len)
    }
}

impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > core::fmt::Debug for BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitPlanes")
            .field("planes", &PLANES)
            .field("rows", &NROWS)
            .field("words_per_row", &PAIRS)
            .field("size", &core::mem::size_of_val(&self.planes))
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<
        const ROWS: usize,
        const COLS: usize,
        const NROWS: usize,
        const PAIRS: usize,
        const PLANES: usize,
    > defmt::Format for BitPlanes<ROWS, COLS, NROWS, PAIRS, PLANES>
{
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "BitPlanes<{}, {}, {}>", PLANES, NROWS, PAIRS);
        defmt::write!(f, " size: {}", core::mem::size_of_val(&self.planes));
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{compute_pairs, compute_rows, Color, BITPLANES};
    use embedded_graphics::prelude::Point;

    const TEST_ROWS: usize = 32;
    const TEST_COLS: usize = 64;
    const TEST_NROWS: usize = compute_rows(TEST_ROWS);
    const TEST_PAIRS: usize = compute_pairs(TEST_COLS);

    type TestPlanes = BitPlanes<TEST_ROWS, TEST_COLS, TEST_NROWS, TEST_PAIRS, BITPLANES>;
    type TestFrameBuffer = FrameBuffer<TEST_ROWS, TEST_COLS>;

    #[test]
    fn test_pair_word_construction() {
        let word = PairWord::new();
        assert_eq!(word.0, 0);
    }

    #[test]
    fn test_pair_word_even_column_layout() {
        // Bits 0-5: top R,G,B then bottom R,G,B for the even column
        let mut word = PairWord::new();
        word.set_red1_even(true);
        assert_eq!(word.0, 0b0000_0000_0001);
        word.set_grn1_even(true);
        assert_eq!(word.0, 0b0000_0000_0011);
        word.set_blu1_even(true);
        assert_eq!(word.0, 0b0000_0000_0111);
        word.set_red2_even(true);
        assert_eq!(word.0, 0b0000_0000_1111);
        word.set_grn2_even(true);
        assert_eq!(word.0, 0b0000_0001_1111);
        word.set_blu2_even(true);
        assert_eq!(word.0, 0b0000_0011_1111);
    }

    #[test]
    fn test_pair_word_odd_column_layout() {
        // Bits 6-11 repeat the channel order for the odd column
        let mut word = PairWord::new();
        word.set_red1_odd(true);
        assert_eq!(word.0, 1 << 6);
        word.set_grn1_odd(true);
        assert_eq!(word.0 & (1 << 7), 1 << 7);
        word.set_blu1_odd(true);
        assert_eq!(word.0 & (1 << 8), 1 << 8);
        word.set_red2_odd(true);
        assert_eq!(word.0 & (1 << 9), 1 << 9);
        word.set_grn2_odd(true);
        assert_eq!(word.0 & (1 << 10), 1 << 10);
        word.set_blu2_odd(true);
        assert_eq!(word.0, 0b1111_1100_0000);
    }

    #[test]
    fn test_pair_word_set_top_and_bottom() {
        let mut word = PairWord::new();

        word.set_top(0, true, false, true);
        assert!(word.red1_even());
        assert!(!word.grn1_even());
        assert!(word.blu1_even());

        word.set_bottom(1, false, true, false);
        assert!(!word.red2_odd());
        assert!(word.grn2_odd());
        assert!(!word.blu2_odd());

        // Unrelated bits untouched
        assert!(!word.red1_odd());
        assert!(!word.red2_even());
    }

    #[test]
    fn test_channel_bit() {
        assert!(channel_bit(0b1000_0000, 7));
        assert!(!channel_bit(0b1000_0000, 6));
        assert!(channel_bit(0b0000_0001, 0));
        for plane in 0..BITPLANES {
            assert!(channel_bit(0xFF, plane));
            assert!(!channel_bit(0x00, plane));
        }
    }

    #[test]
    fn test_encode_clear_framebuffer_is_all_zero() {
        let mut fb = TestFrameBuffer::new();
        fb.set_pixel(Point::new(3, 3), Color::WHITE);
        fb.clear();

        let mut planes = TestPlanes::new();
        planes.encode(&fb);

        for plane in 0..BITPLANES {
            for row in 0..TEST_NROWS {
                assert!(planes.row_words(plane, row).iter().all(|&w| w == 0));
            }
        }
    }

    #[test]
    fn test_encode_full_red_top_left() {
        // Scenario: (0,0) = (255,0,0), everything else clear. Plane 7's
        // word at row 0, pair 0 must be exactly bit 0.
        let mut fb = TestFrameBuffer::new();
        fb.set_pixel(Point::new(0, 0), Color::new(255, 0, 0));

        let mut planes = TestPlanes::new();
        planes.encode(&fb);

        assert_eq!(planes.row_words(7, 0)[0], 0b1);

        // 255 has every bit set, so every plane carries the pixel
        for plane in 0..BITPLANES {
            assert_eq!(planes.row_words(plane, 0)[0], 0b1);
            // and nothing else anywhere
            for row in 0..TEST_NROWS {
                for (pair, &word) in planes.row_words(plane, row).iter().enumerate() {
                    if (row, pair) != (0, 0) {
                        assert_eq!(word, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_encode_reproduces_channel_bits() {
        // Bit k of each stored channel value must appear in plane k
        let mut fb = TestFrameBuffer::new();
        let color = Color::new(0b1010_1010, 0b0101_0101, 0b1100_0011);
        fb.set_pixel(Point::new(13, 4), color);

        let mut planes = TestPlanes::new();
        planes.encode(&fb);

        // x = 13 is the odd column of pair 6, y = 4 is the top half
        for plane in 0..BITPLANES {
            let word = planes.row_words(plane, 4)[6];
            assert_eq!(word & (1 << 6) != 0, channel_bit(color.r(), plane));
            assert_eq!(word & (1 << 7) != 0, channel_bit(color.g(), plane));
            assert_eq!(word & (1 << 8) != 0, channel_bit(color.b(), plane));
            // bottom-half bits of the pair stay clear
            assert_eq!(word & (0b111 << 9), 0);
            assert_eq!(word & 0b11_1111, 0);
        }
    }

    #[test]
    fn test_encode_bottom_half_mapping() {
        // A pixel at y >= NROWS lands in the bottom-half bits of row
        // y - NROWS
        let mut fb = TestFrameBuffer::new();
        fb.set_pixel(Point::new(2, (TEST_NROWS + 9) as i32), Color::new(0, 255, 0));

        let mut planes = TestPlanes::new();
        planes.encode(&fb);

        // x = 2 is the even column of pair 1
        for plane in 0..BITPLANES {
            let word = planes.row_words(plane, 9)[1];
            assert_eq!(word, 1 << 4); // bottom green, even column
        }
        // top-half row 9 of pair 1 carries nothing else
        assert_eq!(planes.row_words(0, 9)[1] & 0b111, 0);
    }

    #[test]
    fn test_encode_known_pixel_pair() {
        // Known top/bottom pair in the same column: check the packed word
        // against the layout bit by bit.
        let mut fb = TestFrameBuffer::new();
        // Both pixels have bit 3 set on all channels
        let v = 0b0000_1000;
        fb.set_pixel(Point::new(10, 2), Color::new(v, 0, v));
        fb.set_pixel(Point::new(10, (2 + TEST_NROWS) as i32), Color::new(0, v, 0));

        let mut planes = TestPlanes::new();
        planes.encode(&fb);

        // x = 10 is the even column of pair 5
        let word = planes.row_words(3, 2)[5];
        // top red (bit 0), top blue (bit 2), bottom green (bit 4)
        assert_eq!(word, 0b1_0101);

        // Any other plane is empty for these pixels
        for plane in (0..BITPLANES).filter(|&p| p != 3) {
            assert_eq!(planes.row_words(plane, 2)[5], 0);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let mut fb = TestFrameBuffer::new();
        for i in 0..16i32 {
            fb.set_pixel(
                Point::new(i * 3, i),
                Color::new(i as u8 * 16, 255 - i as u8, i as u8),
            );
        }

        let mut first = TestPlanes::new();
        first.encode(&fb);
        let mut second = TestPlanes::new();
        second.encode(&fb);

        for plane in 0..BITPLANES {
            for row in 0..TEST_NROWS {
                assert_eq!(first.row_words(plane, row), second.row_words(plane, row));
            }
        }
    }

    #[test]
    fn test_encode_overwrites_stale_planes() {
        // Full rebuild: pixels cleared from the framebuffer must vanish
        // from every plane on the next encode.
        let mut fb = TestFrameBuffer::new();
        fb.set_pixel(Point::new(20, 7), Color::WHITE);

        let mut planes = TestPlanes::new();
        planes.encode(&fb);
        assert_ne!(planes.row_words(0, 7)[10], 0);

        fb.clear();
        planes.encode(&fb);
        assert_eq!(planes.row_words(0, 7)[10], 0);
    }

    #[test]
    fn test_row_words_length() {
        let planes = TestPlanes::new();
        for plane in 0..BITPLANES {
            for row in 0..TEST_NROWS {
                assert_eq!(planes.row_words(plane, row).len(), TEST_PAIRS);
            }
        }
    }

    #[test]
    fn test_read_buffer_implementation() {
        let planes = TestPlanes::new();

        unsafe {
            let (ptr, len) = planes.read_buffer();
            assert!(!ptr.is_null());
            assert_eq!(len, BITPLANES * TEST_NROWS * TEST_PAIRS);
        }

        let mut planes = TestPlanes::new();
        let planes_ref = &mut planes;
        unsafe {
            let (ptr, len) = planes_ref.read_buffer();
            assert!(!ptr.is_null());
            assert_eq!(len, BITPLANES * TEST_NROWS * TEST_PAIRS);
        }
    }

    #[test]
    fn test_memory_alignment() {
        let planes = TestPlanes::new();
        let ptr = core::ptr::addr_of!(planes) as usize;

        // repr(align(4)) for 32-bit-bus DMA
        assert_eq!(ptr % 4, 0);
    }
}
