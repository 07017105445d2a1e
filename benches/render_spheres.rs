use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use bdpath::{
    Integrator, RenderSettings, render,
    scene::demo::{self, Demo},
};

fn criterion_benchmark(c: &mut Criterion) {
    let settings = RenderSettings {
        sample_count: 4.try_into().unwrap(),
        seed: Some(0),
        ..Default::default()
    };

    let mut group = c.benchmark_group("render");
    for demo in Demo::ALL {
        let scene = demo::build(demo).unwrap();
        let id = BenchmarkId::new("bidirectional", format!("{demo:?}"));
        group.bench_with_input(id, &scene, |b, scene| {
            b.iter(|| render(scene, 160, 120, &settings).unwrap())
        });
    }

    let scene = demo::build(Demo::Spheres).unwrap();
    let whitted = RenderSettings {
        integrator: Integrator::Whitted { bounces: 5 },
        ..settings
    };
    group.bench_function("whitted/Spheres", |b| {
        b.iter(|| render(&scene, 160, 120, &whitted).unwrap())
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(20));
    targets = criterion_benchmark
}
criterion_main!(benches);
