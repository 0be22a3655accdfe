use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use saga::{Payload, SagaState, StepStatus, derive_status, room_reservation};

fn bench_derive_status(c: &mut Criterion) {
    let statuses = vec![
        StepStatus::Succeeded,
        StepStatus::Failed,
        StepStatus::Compensating,
        StepStatus::Succeeded,
    ];

    c.bench_function("saga/derive_status", |b| {
        b.iter(|| derive_status(black_box(&statuses)));
    });
}

fn bench_happy_path(c: &mut Criterion) {
    let def = room_reservation::definition();

    c.bench_function("saga/happy_path_transitions", |b| {
        b.iter(|| {
            let mut saga =
                SagaState::create(def.saga_type(), Payload::new(), def.steps().first().clone());
            saga.apply_step_result(def.steps(), StepStatus::Succeeded);
            saga.apply_step_result(def.steps(), StepStatus::Succeeded);
            black_box(saga.saga_status())
        });
    });
}

fn bench_compensation_path(c: &mut Criterion) {
    let def = room_reservation::definition();

    c.bench_function("saga/compensation_transitions", |b| {
        b.iter(|| {
            let mut saga =
                SagaState::create(def.saga_type(), Payload::new(), def.steps().first().clone());
            saga.apply_step_result(def.steps(), StepStatus::Succeeded);
            saga.apply_step_result(def.steps(), StepStatus::Failed);
            saga.apply_step_result(def.steps(), StepStatus::Compensated);
            black_box(saga.saga_status())
        });
    });
}

criterion_group!(
    benches,
    bench_derive_status,
    bench_happy_path,
    bench_compensation_path
);
criterion_main!(benches);
