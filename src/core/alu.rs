// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Arithmetic logic unit.
//!
//! Stateless operations over [`MachineWord`]s at a configured word
//! length. Operand widths must match the configured length.

use crate::core::word::MachineWord;

/// ALU for a fixed word length.
#[derive(Debug, Clone, Copy)]
pub struct Alu {
    word_length: u32,
}

impl Alu {
    /// Create an ALU operating on `word_length`-bit words.
    pub fn new(word_length: u32) -> Self {
        Self { word_length }
    }

    /// Add two words, wrapping at the word width. Commutative.
    pub fn add(&self, x: MachineWord, y: MachineWord) -> MachineWord {
        self.check(&[x, y]);
        MachineWord::from_bits(x.raw_bits().wrapping_add(y.raw_bits()), self.word_length)
    }

    /// Bitwise and. Commutative.
    pub fn and(&self, x: MachineWord, y: MachineWord) -> MachineWord {
        self.check(&[x, y]);
        MachineWord::from_bits(x.raw_bits() & y.raw_bits(), self.word_length)
    }

    /// Bitwise or. Commutative.
    pub fn or(&self, x: MachineWord, y: MachineWord) -> MachineWord {
        self.check(&[x, y]);
        MachineWord::from_bits(x.raw_bits() | y.raw_bits(), self.word_length)
    }

    /// Bitwise xor. Commutative.
    pub fn xor(&self, x: MachineWord, y: MachineWord) -> MachineWord {
        self.check(&[x, y]);
        MachineWord::from_bits(x.raw_bits() ^ y.raw_bits(), self.word_length)
    }

    /// All-ones word if the operands are equal, all-zero word otherwise.
    pub fn negative_if_equals(&self, x: MachineWord, y: MachineWord) -> MachineWord {
        self.check(&[x, y]);
        if x.raw_bits() == y.raw_bits() {
            MachineWord::new(-1, self.word_length)
        } else {
            MachineWord::new(0, self.word_length)
        }
    }

    /// Rotate one place to the right; the lsb wraps into the msb.
    pub fn rar(&self, a: MachineWord) -> MachineWord {
        self.check(&[a]);
        let lsb = a.raw_bits() & 1;
        MachineWord::from_bits(
            a.raw_bits() >> 1 | lsb << (self.word_length - 1),
            self.word_length,
        )
    }

    fn check(&self, words: &[MachineWord]) {
        for w in words {
            assert_eq!(
                w.word_length(),
                self.word_length,
                "machine words must match the configured word length"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LEN: u32 = 24;

    fn word(v: i64) -> MachineWord {
        MachineWord::new(v, LEN)
    }

    proptest! {
        #[test]
        fn add_wraps_at_word_width(a in -(1i64 << 23)..(1i64 << 23), b in -(1i64 << 23)..(1i64 << 23)) {
            let sum = Alu::new(LEN).add(word(a), word(b));
            prop_assert_eq!(sum.raw_bits(), (a + b) as u64 & ((1 << LEN) - 1));
        }

        #[test]
        fn eql_is_total_and_reflexive(a in -(1i64 << 23)..(1i64 << 23), b in -(1i64 << 23)..(1i64 << 23)) {
            let alu = Alu::new(LEN);
            prop_assert_eq!(alu.negative_if_equals(word(a), word(a)).value(), -1);
            let expected = if a == b { -1 } else { 0 };
            prop_assert_eq!(alu.negative_if_equals(word(a), word(b)).value(), expected);
        }
    }

    #[test]
    fn add_overflow_wraps_to_negative() {
        let max = word((1 << 23) - 1);
        assert_eq!(Alu::new(LEN).add(max, word(1)).value(), -(1 << 23));
    }

    #[test]
    fn rar_rotates_lsb_into_msb() {
        let alu = Alu::new(4);
        let rotated = alu.rar(MachineWord::from_bits(0b0101, 4));
        assert_eq!(rotated.raw_bits(), 0b1010);
        let rotated = alu.rar(MachineWord::from_bits(0b0100, 4));
        assert_eq!(rotated.raw_bits(), 0b0010);
    }

    #[test]
    fn bitwise_ops() {
        let alu = Alu::new(LEN);
        assert_eq!(alu.and(word(0b1100), word(0b1010)).raw_bits(), 0b1000);
        assert_eq!(alu.or(word(0b1100), word(0b1010)).raw_bits(), 0b1110);
        assert_eq!(alu.xor(word(0b1100), word(0b1010)).raw_bits(), 0b0110);
    }

    #[test]
    #[should_panic]
    fn mismatched_width_is_a_programming_fault() {
        Alu::new(24).add(MachineWord::new(1, 20), MachineWord::new(1, 24));
    }
}
