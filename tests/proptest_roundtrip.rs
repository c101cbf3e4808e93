//! Property-based round-trip checks for the register/scalar conversions
//! in `bytes.rs` (§4.2, §8). Complements the fixed-value unit tests
//! already in that module with arbitrary-input coverage.

use proptest::prelude::*;

use modbus_stack::crc::crc16;
use modbus_stack::{
    f32_to_regs, f64_to_regs, i32_to_regs, i64_to_regs, regs_to_f32, regs_to_f64, regs_to_i32, regs_to_i64,
    regs_to_u32, regs_to_u64, registers_to_string, string_to_registers, u32_to_regs, u64_to_regs, WordOrder,
};

fn word_order() -> impl Strategy<Value = WordOrder> {
    prop_oneof![Just(WordOrder::LowHighFirst), Just(WordOrder::HighLowFirst)]
}

proptest! {
    #[test]
    fn u32_round_trips_through_registers(value: u32, order in word_order()) {
        let regs = u32_to_regs(value, order);
        prop_assert_eq!(regs_to_u32(regs, order), value);
    }

    #[test]
    fn i32_round_trips_through_registers(value: i32, order in word_order()) {
        let regs = i32_to_regs(value, order);
        prop_assert_eq!(regs_to_i32(regs, order), value);
    }

    #[test]
    fn f32_round_trips_through_registers(value: f32, order in word_order()) {
        let regs = f32_to_regs(value, order);
        let back = regs_to_f32(regs, order);
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }

    #[test]
    fn u64_round_trips_through_registers(value: u64, order in word_order()) {
        let regs = u64_to_regs(value, order);
        prop_assert_eq!(regs_to_u64(regs, order), value);
    }

    #[test]
    fn i64_round_trips_through_registers(value: i64, order in word_order()) {
        let regs = i64_to_regs(value, order);
        prop_assert_eq!(regs_to_i64(regs, order), value);
    }

    #[test]
    fn f64_round_trips_through_registers(value: f64, order in word_order()) {
        let regs = f64_to_regs(value, order);
        let back = regs_to_f64(regs, order);
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }

    /// §4.2: word order only ever permutes which register holds which
    /// half, so both orders must agree on the OR of all set bits.
    #[test]
    fn word_order_is_a_permutation_not_a_corruption(value: u32) {
        let low_high = u32_to_regs(value, WordOrder::LowHighFirst);
        let high_low = u32_to_regs(value, WordOrder::HighLowFirst);
        let mut low_high_sorted = low_high;
        let mut high_low_sorted = [high_low[1], high_low[0]];
        low_high_sorted.sort_unstable();
        high_low_sorted.sort_unstable();
        prop_assert_eq!(low_high_sorted, high_low_sorted);
    }

    #[test]
    fn ascii_string_round_trips_when_even_length(s in "[ -~]{0,64}") {
        let s = if s.len() % 2 == 1 { format!("{s} ") } else { s };
        let regs = string_to_registers(&s);
        prop_assert_eq!(registers_to_string(&regs, 0, s.len()), s);
    }

    /// §4.1/§8: the same bytes always produce the same CRC.
    #[test]
    fn crc16_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(crc16(&data), crc16(&data));
    }

    /// §4.1: CRC-16 is order-dependent — reversing a non-palindromic
    /// byte slice must not (except by coincidence) leave the CRC fixed.
    /// A true collision is possible but astronomically unlikely across
    /// random inputs, which is exactly what this property is checking.
    #[test]
    fn crc16_is_order_dependent(data in prop::collection::vec(any::<u8>(), 2..256)) {
        let mut reversed = data.clone();
        reversed.reverse();
        prop_assume!(reversed != data);
        prop_assert_ne!(crc16(&data), crc16(&reversed));
    }
}
