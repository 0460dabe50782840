use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qc_model::{Dimension, InspectionRecord};
use trend_engine::{build, calculate_trend, Granularity, ReportKind, TrendDefinition};

fn records(count: usize) -> Vec<InspectionRecord> {
    const DEFECTS: [&str; 8] = [
        "Open Seam",
        "Broken Stitch",
        "Dirty Mark",
        "Skip Stitch",
        "Pleat",
        "Uneven Hem",
        "Oil Stain",
        "Puckering",
    ];

    (0..count)
        .map(|i| {
            let date = format!("2024-{:02}-{:02}", 1 + i % 12, 1 + i % 28);
            let mut record = InspectionRecord::new(date, 100 + (i % 50) as u64, 0)
                .with_dimension(Dimension::Line, format!("L{}", i % 30))
                .with_dimension(Dimension::Buyer, format!("Buyer{}", i % 6))
                .with_dimension(Dimension::Color, format!("Color{}", i % 9));
            for d in 0..(i % 4) {
                let qty = ((i + d) % 5) as u64;
                record.defect_qty += qty;
                record = record.with_defect(DEFECTS[(i + d) % DEFECTS.len()], qty);
            }
            record
        })
        .collect()
}

fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_build");
    let dims = [Dimension::Line, Dimension::Buyer, Dimension::Color];

    for size in [1_000usize, 10_000, 50_000] {
        let data = records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| build(black_box(data), &dims, Granularity::Week))
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_trend");
    let data = records(50_000);

    for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
        let def = TrendDefinition::new(ReportKind::Sunrise, granularity)
            .with_group_by([Dimension::Line, Dimension::Buyer]);
        group.bench_with_input(
            BenchmarkId::from_parameter(granularity.display_name()),
            &def,
            |b, def| b.iter(|| calculate_trend(black_box(def), black_box(&data))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_hierarchy, bench_full_pipeline);
criterion_main!(benches);
