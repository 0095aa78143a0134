//! Hot-path benchmarks for the conflating channel.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use conflux::conflated;
use conflux::select::{ClauseId, Selector};

fn bench_send(c: &mut Criterion) {
  let mut group = c.benchmark_group("conflated/send");

  group.bench_function("into_empty_slot", |b| {
    let (tx, rx) = conflated::channel();
    b.iter(|| {
      tx.send(black_box(1u64)).unwrap();
      rx.try_recv().unwrap()
    });
  });

  group.bench_function("displacing_full_slot", |b| {
    let (tx, _rx) = conflated::channel();
    tx.send(0u64).unwrap();
    b.iter(|| tx.send(black_box(1u64)).unwrap());
  });

  group.finish();
}

fn bench_recv(c: &mut Criterion) {
  let mut group = c.benchmark_group("conflated/recv");

  group.bench_function("try_recv_empty", |b| {
    let (_tx, rx) = conflated::channel::<u64>();
    b.iter(|| rx.try_recv().is_err());
  });

  group.finish();
}

fn bench_select(c: &mut Criterion) {
  let mut group = c.benchmark_group("conflated/select");

  group.bench_function("offer_then_drain", |b| {
    let (tx, rx) = conflated::channel();
    b.iter(|| {
      let selector = Selector::new();
      let mut clause = tx.offer_clause(black_box(1u64));
      clause.try_select(&selector, ClauseId::new(0)).unwrap();
      rx.try_recv().unwrap()
    });
  });

  group.finish();
}

criterion_group!(benches, bench_send, bench_recv, bench_select);
criterion_main!(benches);
