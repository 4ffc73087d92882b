//! Benchmarks for the scheduler crate.

use chronoline_clock as clock;
use chronoline_events::TriggerNotify;
use chronoline_scheduler::{Scheduler, Strategy, TimelineQueue};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

struct Nop;

impl TriggerNotify for Nop {
    fn notify(&self) {}
}

fn nop() -> Arc<dyn TriggerNotify> {
    Arc::new(Nop)
}

fn bench_insert_monotonic(c: &mut Criterion) {
    c.bench_function("queue_insert_monotonic", |b| {
        b.iter(|| {
            let mut queue = TimelineQueue::new();
            for time in 0..1_000i64 {
                black_box(queue.insert(nop(), black_box(time)));
            }
            queue
        });
    });
}

fn bench_insert_reversed(c: &mut Criterion) {
    c.bench_function("queue_insert_reversed", |b| {
        b.iter(|| {
            let mut queue = TimelineQueue::new();
            for time in (0..1_000i64).rev() {
                black_box(queue.insert(nop(), black_box(time)));
            }
            queue
        });
    });
}

fn bench_cancel_sweep(c: &mut Criterion) {
    c.bench_function("queue_cancel_sweep", |b| {
        b.iter(|| {
            let mut queue = TimelineQueue::new();
            let refs: Vec<_> = (0..1_000i64).map(|t| queue.insert(nop(), t)).collect();
            for node in refs {
                black_box(queue.remove(black_box(node)));
            }
            queue
        });
    });
}

fn bench_poll_due_triggers(c: &mut Criterion) {
    c.bench_function("scheduler_poll_due", |b| {
        b.iter(|| {
            let scheduler = Scheduler::new(Strategy::Polled);
            let past_us = clock::now_us() - 1;
            for _ in 0..1_000 {
                let _ = scheduler.schedule(nop(), past_us);
            }
            scheduler.poll();
            black_box(scheduler.len())
        });
    });
}

criterion_group!(
    benches,
    bench_insert_monotonic,
    bench_insert_reversed,
    bench_cancel_sweep,
    bench_poll_due_triggers,
);

criterion_main!(benches);
