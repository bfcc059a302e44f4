//! Criterion micro-benchmarks for backend selection and scheduling.

use std::hint::black_box;

use corral_core::{Device, DeviceClass, Family, Shape};
use corral_engine::Operations;
use corral_ops::{FreeVolume, HpmcIntegrator, Sdf, Sort, ZeroMomentum};
use corral_test_utils::{mock_context, mock_selector};
use criterion::{criterion_group, criterion_main, Criterion};

/// Benchmark: resolve every mock integrator and compute constructor once.
fn bench_resolve(c: &mut Criterion) {
    let (selector, _) = mock_selector();
    let families = [
        Family::Hpmc(Shape::Sphere),
        Family::Hpmc(Shape::Ellipsoid),
        Family::Hpmc(Shape::ConvexPolyhedron),
    ];

    c.bench_function("resolve_hpmc_lanes", |b| {
        b.iter(|| {
            for family in families {
                for device in [DeviceClass::Host, DeviceClass::Accelerator] {
                    black_box(selector.integrator("hpmc", family, device).is_ok());
                    black_box(
                        selector
                            .compute("free_volume", Some(family), device)
                            .is_ok(),
                    );
                }
            }
        });
    });

    c.bench_function("resolve_updater_any_fallback", |b| {
        b.iter(|| {
            black_box(
                selector
                    .updater("sort", Some(Family::Md), DeviceClass::Host)
                    .is_ok(),
            );
        });
    });
}

/// Benchmark: full re-attach of an integrator, two computes, and two updaters.
fn bench_schedule(c: &mut Criterion) {
    let (selector, _) = mock_selector();
    let (context, _system) = mock_context();
    let mut ops = Operations::new();
    let mut hpmc = HpmcIntegrator::new(Shape::Sphere, 1);
    hpmc.set_diameter("A", 1.0).unwrap();
    hpmc.set_diameter("B", 1.0).unwrap();
    ops.add(hpmc);
    ops.add(FreeVolume::new("A", 100));
    ops.add(Sdf::new(2.0, 0.01));
    ops.add(Sort::new());
    ops.add(ZeroMomentum::new());
    let device = Device::host();

    c.bench_function("schedule_five_operations", |b| {
        b.iter(|| {
            ops.schedule(Some(&context), &selector, &device).unwrap();
        });
    });
}

criterion_group!(benches, bench_resolve, bench_schedule);
criterion_main!(benches);
