use criterion::{Criterion, black_box, criterion_group, criterion_main};

use rust_anfis::{AnfisConfig, Dataset, HybridTrainer, TrainConfig};

fn control_law(e: f64, de: f64) -> f64 {
    (-0.5 * e - 2.0 * de).clamp(-100.0, 100.0)
}

fn training_set() -> Dataset {
    let mut inputs = Vec::with_capacity(21 * 21);
    for i in 0..=20 {
        for j in 0..=20 {
            inputs.push([-100.0 + 10.0 * i as f64, -10.0 + 1.0 * j as f64]);
        }
    }
    Dataset::from_fn(&inputs, control_law).unwrap()
}

fn anfis_forward_bench(c: &mut Criterion) {
    let model = AnfisConfig::default().build_model(0).unwrap();
    let mut scratch = model.scratch();

    c.bench_function("anfis_forward_5x5", |b| {
        b.iter(|| {
            let y = model.forward(black_box(37.5), black_box(-2.5), &mut scratch);
            black_box(y)
        })
    });
}

fn anfis_backward_bench(c: &mut Criterion) {
    let model = AnfisConfig::default().build_model(0).unwrap();
    let mut scratch = model.scratch();
    let mut grads = model.gradients();
    model.forward(37.5, -2.5, &mut scratch).unwrap();

    c.bench_function("anfis_backward_5x5", |b| {
        b.iter(|| {
            model.backward(black_box(37.5), black_box(-2.5), &scratch, 1.0, &mut grads);
        })
    });
}

fn hybrid_epoch_bench(c: &mut Criterion) {
    let train = training_set();
    let base = AnfisConfig::default().build_model(0).unwrap();

    c.bench_function("hybrid_epoch_5x5_441_samples", |b| {
        b.iter(|| {
            let mut model = base.clone();
            let mut trainer = HybridTrainer::new(&model, TrainConfig::default()).unwrap();
            let report = trainer.run_epoch(&mut model, black_box(&train)).unwrap();
            black_box(report)
        })
    });
}

criterion_group!(
    benches,
    anfis_forward_bench,
    anfis_backward_bench,
    hybrid_epoch_bench
);
criterion_main!(benches);
