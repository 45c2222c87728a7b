//! Region growth and compositing benchmarks

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use image::Rgba;
use texpaint::canvas::PixelBuffer;
use texpaint::components::layers::LayerStack;
use texpaint::compositor::composite_with;
use texpaint::ops::fill::{flood_fill, select_similar};
use texpaint::settings::EngineSettings;

/// Checkerboard of 8x8 tiles with a one-pixel dark grid, so fills have to
/// walk a non-trivial boundary.
fn grid_buffer(size: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::filled(size, size, Rgba([240, 240, 240, 255])).unwrap();
    for y in 0..size {
        for x in 0..size {
            if x % 64 == 0 || y % 64 == 0 {
                buf.set(x, y, Rgba([20, 20, 20, 255])).unwrap();
            } else if (x / 8 + y / 8) % 2 == 0 {
                buf.set(x, y, Rgba([235, 238, 241, 255])).unwrap();
            }
        }
    }
    buf
}

fn layered_stack(size: u32, layers: usize) -> LayerStack {
    let mut stack = LayerStack::new(size, size).unwrap();
    stack.active_buffer_mut().fill(Rgba([255, 255, 255, 255]));
    for i in 1..layers {
        stack.add_layer(None);
        let v = (i * 40 % 256) as u8;
        stack.active_buffer_mut().fill(Rgba([v, 255 - v, 128, 200]));
        stack.set_opacity(i, 0.6).unwrap();
    }
    stack
}

fn benchmark_flood_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("Flood Fill");

    for size in [256u32, 1024].iter() {
        let buf = PixelBuffer::new(*size, *size).unwrap();
        group.bench_with_input(BenchmarkId::new("uniform", size), &buf, |b, buf| {
            b.iter(|| {
                let mut work = buf.clone();
                flood_fill(&mut work, (0, 0), Rgba([255, 0, 0, 255])).unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_magic_wand(c: &mut Criterion) {
    let mut group = c.benchmark_group("Magic Wand");

    let buf = grid_buffer(1024);
    for tolerance in [0u8, 30, 255].iter() {
        group.bench_with_input(BenchmarkId::new("select_similar", tolerance), tolerance, |b, &t| {
            b.iter(|| select_similar(&buf, (10, 10), t).unwrap())
        });
    }

    group.finish();
}

fn benchmark_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("Composite");

    let sequential = EngineSettings {
        parallel_composite: false,
        ..Default::default()
    };
    let parallel = EngineSettings {
        parallel_composite: true,
        parallel_min_pixels: 0,
        ..Default::default()
    };

    for layers in [2usize, 8].iter() {
        let stack = layered_stack(1024, *layers);
        group.bench_with_input(BenchmarkId::new("sequential", layers), &stack, |b, stack| {
            b.iter(|| composite_with(stack, &sequential).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", layers), &stack, |b, stack| {
            b.iter(|| composite_with(stack, &parallel).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_flood_fill, benchmark_magic_wand, benchmark_composite);
criterion_main!(benches);
