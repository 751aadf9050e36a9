// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for observation parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use observer_parser::{parse_all, RawRunOutput};

fn synthetic_output(iterations: usize) -> RawRunOutput {
    let mut out = String::from("Starting benchmark.\nRunning warmup runs.\nMain runs.\n");
    for i in 0..iterations {
        out.push_str(&format!(
            "PyTorchObserver {{\"type\": \"NET\", \"unit\": \"us\", \"metric\": \"latency\", \"value\": \"{}\"}}\n",
            580_000 + (i * 37) % 20_000
        ));
    }
    out.push_str("Main run finished. Microseconds per iter: 590000. Iters per second: 1.69492\n");
    RawRunOutput::from_stdout(out)
}

fn bench_parse_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_all");
    for iterations in [10, 100, 1000] {
        let raw = synthetic_output(iterations);
        group.bench_with_input(BenchmarkId::from_parameter(iterations), &raw, |b, raw| {
            b.iter(|| parse_all(black_box(raw)).map(|r| r.len()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_all);
criterion_main!(benches);
