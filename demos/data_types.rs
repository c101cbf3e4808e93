//! Data Types Example
//!
//! Demonstrates how to pack and unpack wide industrial data types
//! (floats, 32/64-bit integers, strings) across multiple 16-bit
//! Modbus registers using `WordOrder`.
//!
//! # Industrial Data Types
//!
//! Modbus registers are 16-bit (u16), but industrial devices often store
//! larger data types across multiple registers:
//!
//! | Type    | Registers | Description |
//! |---------|-----------|-------------|
//! | U16/I16 | 1         | Single register |
//! | U32/I32 | 2         | Two registers |
//! | F32     | 2         | IEEE 754 float |
//! | U64/I64 | 4         | Four registers |
//! | F64     | 4         | IEEE 754 double |
//!
//! # Word Order
//!
//! Different manufacturers order the registers of a multi-register value
//! differently:
//!
//! - **LowHighFirst**: the first register holds the low-order word
//! - **HighLowFirst**: the first register holds the high-order word
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example data_types
//! ```

use modbus_stack::{regs_to_f32, regs_to_f64, regs_to_i32, regs_to_u32, WordOrder};

fn main() {
    // =========================================================================
    // Part 1: Word Order - Float32 decoding
    // =========================================================================
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              Word Order Decoding Examples                  ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    // These registers represent 50.0 as Float32 with the high word first.
    // 0x4248 0x0000 = 50.0 in IEEE 754, high word first.
    let test_regs: [u16; 2] = [0x4248, 0x0000];

    println!("Input registers: [0x{:04X}, 0x{:04X}]", test_regs[0], test_regs[1]);
    println!("\nFloat32 interpretation under each word order:\n");

    for order in [WordOrder::HighLowFirst, WordOrder::LowHighFirst] {
        let f32_val = regs_to_f32(test_regs, order);
        println!("  {:?} -> {:.4}", order, f32_val);
    }

    // =========================================================================
    // Part 2: U32/I32 decoding
    // =========================================================================
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║              U32/I32 Decoding Examples                      ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    let u32_regs: [u16; 2] = [0x1234, 0x5678];
    println!("Input registers: [0x{:04X}, 0x{:04X}]\n", u32_regs[0], u32_regs[1]);

    println!("{:<16} {:>15} {:>15}", "Word Order", "U32 (hex)", "U32 (decimal)");
    println!("{}", "-".repeat(48));

    for order in [WordOrder::HighLowFirst, WordOrder::LowHighFirst] {
        let u32_val = regs_to_u32(u32_regs, order);
        println!("{:<16} 0x{:08X} {:>15}", format!("{:?}", order), u32_val, u32_val);
    }

    println!("\nSigned I32 interpretation:");
    let i32_val = regs_to_i32(u32_regs, WordOrder::HighLowFirst);
    println!("  HighLowFirst: {} (0x{:08X})", i32_val, i32_val as u32);

    // =========================================================================
    // Part 3: F64 (Double) decoding
    // =========================================================================
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║              F64 (Double) Decoding Example                  ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    // These 4 registers represent PI as Float64, high word first.
    // IEEE 754 double: 0x400921FB54442D18
    let f64_regs: [u16; 4] = [0x4009, 0x21FB, 0x5444, 0x2D18];
    println!(
        "Input registers: [0x{:04X}, 0x{:04X}, 0x{:04X}, 0x{:04X}]",
        f64_regs[0], f64_regs[1], f64_regs[2], f64_regs[3]
    );

    let f64_val = regs_to_f64(f64_regs, WordOrder::HighLowFirst);
    println!("\nFloat64 HighLowFirst: {:.15}", f64_val);
    println!("Expected (π):         {:.15}", std::f64::consts::PI);

    // =========================================================================
    // Part 4: Practical tips
    // =========================================================================
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║              Practical Tips                                 ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    println!("1. Check your device's documentation for word order");
    println!("2. Most industrial PLCs put the high word first");
    println!("3. When in doubt, try reading a known value (like 1.0)");
    println!("\nCommon Float32 test values (high word first):");
    println!("  1.0  -> [0x3F80, 0x0000]");
    println!("  50.0 -> [0x4248, 0x0000]");
    println!("  100.0-> [0x42C8, 0x0000]");
}
