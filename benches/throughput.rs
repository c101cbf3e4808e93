//! Throughput benchmarks for the hot paths on the master/slave fast path:
//! CRC-16 computation, PDU construction, and response parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use modbus_stack::{crc::crc16, ModbusFunction, ModbusRequest};

fn crc_benchmark(c: &mut Criterion) {
    let frame: Vec<u8> = (0..253).map(|i| (i % 256) as u8).collect();

    let mut group = c.benchmark_group("crc16");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("full_pdu", |b| {
        b.iter(|| black_box(crc16(black_box(&frame))))
    });

    let short_frame = &frame[..8];
    group.bench_function("short_frame", |b| {
        b.iter(|| black_box(crc16(black_box(short_frame))))
    });

    group.finish();
}

fn pdu_build_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdu_build");

    let read_request = ModbusRequest {
        slave_id: 1,
        function: ModbusFunction::ReadHoldingRegisters,
        address: 0,
        quantity: 100,
        data: Vec::new(),
    };

    group.bench_function("read_holding_registers", |b| {
        b.iter(|| black_box(modbus_stack::build_request_pdu(black_box(&read_request))))
    });

    let write_values: Vec<u8> = (0..200).map(|i| (i % 256) as u8).collect();
    let write_request = ModbusRequest {
        slave_id: 1,
        function: ModbusFunction::WriteMultipleRegisters,
        address: 0,
        quantity: 100,
        data: write_values,
    };

    group.bench_function("write_multiple_registers", |b| {
        b.iter(|| black_box(modbus_stack::build_request_pdu(black_box(&write_request))))
    });

    group.finish();
}

fn response_parse_benchmark(c: &mut Criterion) {
    let mut body = vec![0x03u8, 200u8];
    body.extend((0..200).map(|i| (i % 256) as u8));

    let mut group = c.benchmark_group("response_parse");
    group.bench_function("parse_response_pdu", |b| {
        b.iter(|| {
            black_box(modbus_stack::parse_response_pdu(
                ModbusFunction::ReadHoldingRegisters,
                black_box(1),
                black_box(&body),
                black_box(0),
            ))
        })
    });

    group.finish();
}

criterion_group!(benches, crc_benchmark, pdu_build_benchmark, response_parse_benchmark);
criterion_main!(benches);
