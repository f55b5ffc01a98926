//! Performance benchmarks for `vmasm`.
//!
//! Measures:
//! - Single instruction latency
//! - Multi-instruction throughput (bytes of source text)
//! - Label-heavy workloads (forward and backward references)
//! - Listing generation
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use vmasm::{assemble, assemble_with, Assembler, InstructionSet, Program};

const EXT: &InstructionSet = &InstructionSet::EXTENDED;

// ─── Single-Instruction Latency ──────────────────────────────────────────────

fn bench_single_instruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_instruction");

    group.bench_function("mov_reg_reg", |b| {
        b.iter(|| assemble(black_box("mov r1, r2")).unwrap())
    });

    group.bench_function("mov_reg_imm16", |b| {
        b.iter(|| assemble(black_box("mov r1, 0x1234")).unwrap())
    });

    group.bench_function("mov_nested_memory", |b| {
        b.iter(|| assemble(black_box("mov r1, [[[r2]]]")).unwrap())
    });

    group.bench_function("mov_float_literal", |b| {
        b.iter(|| assemble(black_box("mov r1, 2.5e2")).unwrap())
    });

    group.bench_function("ext_hlt", |b| {
        b.iter(|| assemble_with(black_box("hlt"), EXT).unwrap())
    });

    group.bench_function("ext_int_absolute", |b| {
        b.iter(|| assemble_with(black_box("int 3, @0x200"), EXT).unwrap())
    });

    group.bench_function("encode_one", |b| {
        let asm = Assembler::new();
        b.iter(|| asm.encode_one(black_box("mov r4, 300")).unwrap())
    });

    group.finish();
}

// ─── Multi-Instruction Throughput ─────────────────────────────────────────────

/// Generate a block of N reference instructions (no labels).
fn gen_reference_block(n: usize) -> String {
    let mut s = String::with_capacity(n * 16);
    for i in 0..n {
        match i % 5 {
            0 => s.push_str("mov r1, r2\n"),
            1 => s.push_str("mov r3, [r4]\n"),
            2 => s.push_str("mov [r5], r6\n"),
            3 => s.push_str("mov r7, 42\n"),
            _ => s.push_str("mov r8, 4242\n"),
        }
    }
    s
}

/// Generate a block of N extended instructions (no labels).
fn gen_extended_block(n: usize) -> String {
    let mut s = String::with_capacity(n * 16);
    for i in 0..n {
        match i % 6 {
            0 => s.push_str("inc r1\n"),
            1 => s.push_str("add r1, r2\n"),
            2 => s.push_str("cmp r1, 200\n"),
            3 => s.push_str("xor r2, 0x1000\n"),
            4 => s.push_str("push r3\n"),
            _ => s.push_str("pop r3\n"),
        }
    }
    s
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    let src_100 = gen_reference_block(100);
    group.throughput(Throughput::Bytes(src_100.len() as u64));
    group.bench_function("reference_100", |b| {
        b.iter(|| assemble(black_box(&src_100)).unwrap())
    });

    let src_1k = gen_reference_block(1_000);
    group.throughput(Throughput::Bytes(src_1k.len() as u64));
    group.bench_function("reference_1k", |b| {
        b.iter(|| assemble(black_box(&src_1k)).unwrap())
    });

    let src_10k = gen_reference_block(10_000);
    group.throughput(Throughput::Bytes(src_10k.len() as u64));
    group.bench_function("reference_10k", |b| {
        b.iter(|| assemble(black_box(&src_10k)).unwrap())
    });

    let src_ext = gen_extended_block(1_000);
    group.throughput(Throughput::Bytes(src_ext.len() as u64));
    group.bench_function("extended_1k", |b| {
        b.iter(|| assemble_with(black_box(&src_ext), EXT).unwrap())
    });

    group.finish();
}

// ─── Labels ───────────────────────────────────────────────────────────────────

/// Generate code with many labels, each referenced once forward and once
/// backward.
fn gen_label_heavy(n_labels: usize) -> String {
    let mut s = String::with_capacity(n_labels * 48);
    for i in 0..n_labels {
        let ahead = (i + 1) % n_labels;
        s.push_str(&format!("label_{i}:\n"));
        s.push_str(&format!("jne @label_{ahead}\n"));
        s.push_str(&format!("jmp @label_{i}\n"));
    }
    s
}

fn bench_labels(c: &mut Criterion) {
    let mut group = c.benchmark_group("labels");

    for n in [50, 500, 5_000] {
        let src = gen_label_heavy(n);
        group.bench_function(format!("{n}_labels"), |b| {
            b.iter(|| assemble_with(black_box(&src), EXT).unwrap())
        });
    }

    // Re-running both passes on an already parsed program.
    let mut program = Program::parse_with(&gen_label_heavy(500), EXT).unwrap();
    group.bench_function("reassemble_500_labels", |b| {
        b.iter(|| program.assemble().unwrap())
    });

    group.finish();
}

// ─── Listing ──────────────────────────────────────────────────────────────────

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");

    let src = gen_label_heavy(200);
    let mut asm = Assembler::new();
    asm.instruction_set(EXT).enable_listing();
    asm.emit(&src).unwrap();
    let result = asm.finish().unwrap();

    group.bench_function("listing_200_labels", |b| {
        b.iter(|| black_box(&result).listing())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_instruction,
    bench_throughput,
    bench_labels,
    bench_listing
);
criterion_main!(benches);
