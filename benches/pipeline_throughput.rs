//! Benchmarks for queue and pipeline throughput
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use staged_pipeline::config::DemoConfig;
use staged_pipeline::demo;
use staged_pipeline::{
    channel, ConsumerStage, FnConsumer, FnJoin, FnProducer, JoinStage, MapProcessor, Message,
    Pipeline, ProcessorStage, ProducerStage, QueueCapacity,
};

const VALUES: usize = 10_000;

fn bench_queue_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_write_read");
    group.throughput(Throughput::Elements(VALUES as u64));

    group.bench_function("unbounded", |b| {
        b.iter(|| {
            let (writer, reader) = channel("bench", QueueCapacity::Unbounded);
            for i in 0..VALUES {
                writer.write(i).unwrap();
            }
            writer.close().unwrap();
            let mut sum = 0usize;
            while let Message::Value(v) = reader.read() {
                sum += v;
            }
            black_box(sum)
        });
    });

    group.finish();
}

fn bench_linear_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_pipeline");
    group.throughput(Throughput::Elements(VALUES as u64));

    let capacities = [
        ("unbounded", QueueCapacity::Unbounded),
        ("bounded_1", QueueCapacity::Bounded(1)),
        ("bounded_64", QueueCapacity::Bounded(64)),
    ];
    for (label, capacity) in capacities {
        group.bench_with_input(BenchmarkId::from_parameter(label), &capacity, |b, &capacity| {
            b.iter(|| {
                let mut source = ProducerStage::new(
                    "source",
                    FnProducer::new(VALUES, |i| i as u64),
                    capacity,
                );
                let mut square = ProcessorStage::new(
                    "square",
                    MapProcessor::new(|v: u64| v.wrapping_mul(v)),
                    source.take_output().unwrap(),
                    capacity,
                );
                let sink = ConsumerStage::new(
                    "sink",
                    FnConsumer::new(|v: u64| {
                        black_box(v);
                    }),
                    square.take_output().unwrap(),
                );
                Pipeline::new()
                    .with(source)
                    .with(square)
                    .with(sink)
                    .run()
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_join_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_fan_in");

    for inputs in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((VALUES / 10 * inputs) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(inputs), &inputs, |b, &inputs| {
            b.iter(|| {
                let mut pipeline = Pipeline::new();
                let mut readers = Vec::with_capacity(inputs);
                for index in 0..inputs {
                    let mut source = ProducerStage::new(
                        format!("source-{index}"),
                        FnProducer::new(VALUES / 10, |i| i as u64),
                        QueueCapacity::Bounded(16),
                    );
                    readers.push(source.take_output().unwrap());
                    pipeline.add(source);
                }
                let mut join = JoinStage::new(
                    "sum",
                    FnJoin::new(|values: Vec<u64>| values.into_iter().sum::<u64>()),
                    readers,
                    QueueCapacity::Bounded(16),
                )
                .unwrap();
                let sink = ConsumerStage::new(
                    "sink",
                    FnConsumer::new(|v: u64| {
                        black_box(v);
                    }),
                    join.take_output().unwrap(),
                );
                pipeline.add(join);
                pipeline.add(sink);
                pipeline.run().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_demo_pipeline(c: &mut Criterion) {
    let config = DemoConfig {
        frames_per_sensor: vec![200, 200, 200],
        ..DemoConfig::default()
    };
    c.bench_function("demo_pipeline", |b| {
        b.iter(|| {
            let mut demo = demo::build(&config, QueueCapacity::Bounded(4)).unwrap();
            demo.pipeline.run().unwrap();
            black_box(demo.rendered.count())
        });
    });
}

criterion_group!(
    benches,
    bench_queue_write_read,
    bench_linear_pipeline,
    bench_join_fan_in,
    bench_demo_pipeline
);
criterion_main!(benches);
