#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::hash::BuildHasherDefault;

use cardinality_sketch::{murmur3_x64_128, murmur3_x86_32, ConcurrentSketch, Sketch};
use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use hyperloglogplus::HyperLogLog as HyperLogLogTrait;
use pprof::criterion::{Output, PProfProfiler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use wyhash::WyHash;

/// Insert and estimate operations are benchmarked against cardinalities ranging from 0 to
/// `DEFAULT_MAX_CARDINALITY` or environment variable `N` (if defined) with cardinality doubled
/// with every iteration as [0, 1, 2, ..., N].
const DEFAULT_MAX_CARDINALITY: usize = 256;

/// Precision shared by all compared estimators
const PRECISION: u8 = 12;

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Protobuf));
    targets = benchmark
}
criterion_main!(benches);

fn benchmark(c: &mut Criterion) {
    let bench_results_path =
        std::env::var("BENCH_RESULTS_PATH").unwrap_or_else(|_| "target".to_string());
    let max_cardinality = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CARDINALITY);

    let cardinalities: Vec<usize> = std::iter::once(0)
        .chain((0..).map(|c| 1 << c))
        .take_while(|&c| c <= max_cardinality)
        .collect();

    bench_hash(c);

    let mut group = c.benchmark_group("insert");
    for &cardinality in &cardinalities {
        group.throughput(Throughput::Elements(cardinality.max(1) as u64));
        bench_insert::<SketchMut>(&mut group, cardinality);
        bench_insert::<SketchWide>(&mut group, cardinality);
        bench_insert::<SketchShared>(&mut group, cardinality);
        bench_insert::<HyperLogLog>(&mut group, cardinality);
        bench_insert::<HyperLogLogPlus>(&mut group, cardinality);
    }
    group.finish();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(1));
    for &cardinality in &cardinalities {
        bench_estimate::<SketchMut>(&mut group, cardinality);
        bench_estimate::<SketchWide>(&mut group, cardinality);
        bench_estimate::<SketchShared>(&mut group, cardinality);
        bench_estimate::<HyperLogLog>(&mut group, cardinality);
        bench_estimate::<HyperLogLogPlus>(&mut group, cardinality);
    }
    group.finish();

    let mut group = c.benchmark_group("merge");
    for &cardinality in &cardinalities {
        bench_merge::<SketchMut>(&mut group, cardinality);
        bench_merge::<HyperLogLog>(&mut group, cardinality);
        bench_merge::<HyperLogLogPlus>(&mut group, cardinality);
    }
    group.finish();

    let results: Vec<StatRecord> = cardinalities
        .iter()
        .map(|&cardinality| StatRecord {
            cardinality,
            sketch: measure_allocations::<SketchMut>(cardinality),
            sketch_wide: measure_allocations::<SketchWide>(cardinality),
            sketch_shared: measure_allocations::<SketchShared>(cardinality),
            hyperloglog: measure_allocations::<HyperLogLog>(cardinality),
            hyperloglogplus: measure_allocations::<HyperLogLogPlus>(cardinality),
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/memory_usage.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();

    let results: Vec<StatRecord> = cardinalities
        .iter()
        .map(|&cardinality| StatRecord {
            cardinality,
            sketch: measure_error::<SketchMut>(cardinality),
            sketch_wide: measure_error::<SketchWide>(cardinality),
            sketch_shared: measure_error::<SketchShared>(cardinality),
            hyperloglog: measure_error::<HyperLogLog>(cardinality),
            hyperloglogplus: measure_error::<HyperLogLogPlus>(cardinality),
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/relative_error.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();
}

fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");
    for len in [4usize, 16, 64, 256, 1024] {
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("murmur3_x86_32", len), &data, |b, data| {
            b.iter(|| murmur3_x86_32(black_box(data), 0))
        });
        group.bench_with_input(BenchmarkId::new("murmur3_x64_128", len), &data, |b, data| {
            b.iter(|| murmur3_x64_128(black_box(data), 0))
        });
        group.bench_with_input(BenchmarkId::new("wyhash", len), &data, |b, data| {
            b.iter(|| wyhash::wyhash(black_box(data), 0))
        });
    }
    group.finish();
}

/// Cardinality estimator trait representing common estimator operations.
trait CardinalityEstimatorTrait {
    fn new() -> Self;
    fn insert(&mut self, item: &usize);
    fn estimate(&mut self) -> usize;
    fn merge(&mut self, rhs: &Self);
    fn name() -> String;
}

fn bench_insert<E: CardinalityEstimatorTrait>(
    group: &mut BenchmarkGroup<WallTime>,
    cardinality: usize,
) {
    group.bench_with_input(
        BenchmarkId::new(E::name(), cardinality),
        &cardinality,
        |b, &cardinality| {
            b.iter(|| {
                let mut estimator = E::new();
                for i in 0..black_box(cardinality) {
                    estimator.insert(black_box(&i));
                }
            });
        },
    );
}

fn bench_estimate<E: CardinalityEstimatorTrait>(
    group: &mut BenchmarkGroup<WallTime>,
    cardinality: usize,
) {
    group.bench_with_input(
        BenchmarkId::new(E::name(), cardinality),
        &cardinality,
        |b, &cardinality| {
            let mut estimator = E::new();
            for i in 0..black_box(cardinality) {
                estimator.insert(black_box(&i));
            }
            b.iter(|| estimator.estimate());
        },
    );
}

fn bench_merge<E: CardinalityEstimatorTrait>(
    group: &mut BenchmarkGroup<WallTime>,
    cardinality: usize,
) {
    group.bench_with_input(
        BenchmarkId::new(E::name(), cardinality),
        &cardinality,
        |b, &cardinality| {
            let mut lhs = E::new();
            let mut rhs = E::new();
            for i in 0..cardinality {
                lhs.insert(&i);
                rhs.insert(&(i + cardinality / 2));
            }
            b.iter(|| lhs.merge(black_box(&rhs)));
        },
    );
}

fn measure_allocations<E: CardinalityEstimatorTrait>(cardinality: usize) -> String {
    let _profiler = dhat::Profiler::builder().testing().build();
    let mut estimator = E::new();
    for i in 0..cardinality {
        estimator.insert(&i);
    }
    let stats = dhat::HeapStats::get();
    format!(
        "{} / {} / {}",
        std::mem::size_of::<E>(),
        stats.total_bytes,
        stats.total_blocks,
    )
}

fn measure_error<E: CardinalityEstimatorTrait>(cardinality: usize) -> String {
    let n = 100;
    let mut total_relative_error: f64 = 0.0;
    let mut rng = StdRng::seed_from_u64(12345);
    for _ in 0..n {
        let mut estimator = E::new();
        for _ in 0..cardinality {
            estimator.insert(&rng.gen());
        }
        let relative_error = if cardinality == 0 {
            0.0
        } else {
            (estimator.estimate() as f64 - cardinality as f64).abs() / cardinality as f64
        };
        total_relative_error += relative_error;
    }
    let avg_relative_error = total_relative_error / (n as f64);

    if avg_relative_error < 1.0 {
        format!("{:.4}", avg_relative_error)
    } else {
        format!("{:.2e}", avg_relative_error)
    }
}

#[derive(Tabled)]
struct StatRecord {
    cardinality: usize,
    sketch: String,
    sketch_wide: String,
    sketch_shared: String,
    hyperloglog: String,
    hyperloglogplus: String,
}

struct SketchMut(Sketch);

impl CardinalityEstimatorTrait for SketchMut {
    fn new() -> Self {
        Self(Sketch::new(PRECISION).unwrap())
    }

    fn insert(&mut self, item: &usize) {
        self.0.insert(item);
    }

    fn estimate(&mut self) -> usize {
        self.0.count() as usize
    }

    fn merge(&mut self, rhs: &Self) {
        self.0.merge(&rhs.0).unwrap();
    }

    fn name() -> String {
        "sketch".to_string()
    }
}

struct SketchWide(Sketch);

impl CardinalityEstimatorTrait for SketchWide {
    fn new() -> Self {
        let config = cardinality_sketch::SketchConfig::new(PRECISION).with_wide_hash();
        Self(Sketch::with_config(config).unwrap())
    }

    fn insert(&mut self, item: &usize) {
        self.0.insert(item);
    }

    fn estimate(&mut self) -> usize {
        self.0.count() as usize
    }

    fn merge(&mut self, rhs: &Self) {
        self.0.merge(&rhs.0).unwrap();
    }

    fn name() -> String {
        "sketch-wide".to_string()
    }
}

struct SketchShared(ConcurrentSketch);

impl CardinalityEstimatorTrait for SketchShared {
    fn new() -> Self {
        Self(ConcurrentSketch::new(PRECISION).unwrap())
    }

    fn insert(&mut self, item: &usize) {
        self.0.insert(item);
    }

    fn estimate(&mut self) -> usize {
        self.0.count() as usize
    }

    fn merge(&mut self, rhs: &Self) {
        self.0.merge(&rhs.0.snapshot()).unwrap();
    }

    fn name() -> String {
        "sketch-shared".to_string()
    }
}

struct HyperLogLog(hyperloglog::HyperLogLog);

impl CardinalityEstimatorTrait for HyperLogLog {
    fn new() -> Self {
        Self(hyperloglog::HyperLogLog::new(0.01625))
    }

    fn insert(&mut self, item: &usize) {
        self.0.insert(item);
    }

    fn estimate(&mut self) -> usize {
        self.0.len() as usize
    }

    fn merge(&mut self, rhs: &Self) {
        self.0.merge(&rhs.0);
    }

    fn name() -> String {
        "hyperloglog".to_string()
    }
}

struct HyperLogLogPlus(hyperloglogplus::HyperLogLogPlus<usize, BuildHasherDefault<WyHash>>);

impl CardinalityEstimatorTrait for HyperLogLogPlus {
    fn new() -> Self {
        Self(
            hyperloglogplus::HyperLogLogPlus::new(PRECISION, BuildHasherDefault::<WyHash>::default())
                .unwrap(),
        )
    }

    fn insert(&mut self, item: &usize) {
        self.0.insert(item);
    }

    fn estimate(&mut self) -> usize {
        self.0.count() as usize
    }

    fn merge(&mut self, rhs: &Self) {
        self.0.merge(&rhs.0).unwrap();
    }

    fn name() -> String {
        "hyperloglogplus".to_string()
    }
}
