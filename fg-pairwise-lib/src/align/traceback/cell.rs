use serde::{Deserialize, Serialize};

use super::{State, TracebackCell, TB_MAX};

/// Packed representation of one cell of a traceback matrix.
///
/// The `tb` field is packed as follows:
/// - bits 0-1 are for the match plane traceback (M_POS)
/// - bits 2-3 are for the insertion plane traceback (I_POS)
/// - bits 4-5 are for the deletion plane traceback (D_POS)
///
/// Single-plane (linear gap) aligners only use the match plane bits.
#[derive(
    Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize,
)]
pub struct PackedCell {
    tb: u8,
}

// Traceback bit positions (LSB)
const TB_M_POS: u8 = 0; // Meaning bits 0,1 corresponds to M and so on
const TB_I_POS: u8 = 2;
const TB_D_POS: u8 = 4;
const TB_MASK: u8 = 0b11;

impl PackedCell {
    /// Sets 2 bits [pos, pos+2) with the 2 LSBs of value
    #[inline(always)]
    fn set_tb(&mut self, pos: u8, value: u8) {
        debug_assert!(
            value <= TB_MAX,
            "Expected a value <= TB_MAX while setting traceback bits"
        );
        let bits: u8 = TB_MASK << pos;
        self.tb = (self.tb & !bits) // First clear the bits
              | (value << pos) // And set the bits
    }

    // Gets 2 bits [pos, pos+2) of v
    #[inline(always)]
    fn get_tb(self, pos: u8) -> u8 {
        (self.tb >> pos) & TB_MASK
    }

    const fn pos(state: State) -> u8 {
        match state {
            State::Match => TB_M_POS,
            State::Ins => TB_I_POS,
            State::Del => TB_D_POS,
        }
    }
}

impl TracebackCell for PackedCell {
    #[inline(always)]
    fn set(&mut self, plane: State, tb: u8) {
        self.set_tb(Self::pos(plane), tb);
    }

    #[inline(always)]
    fn get(self, plane: State) -> u8 {
        self.get_tb(Self::pos(plane))
    }
}
