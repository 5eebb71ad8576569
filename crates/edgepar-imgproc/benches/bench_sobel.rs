use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use edgepar_image::Image;
use edgepar_imgproc::{
    parallel::{ExecutionStrategy, Executor},
    sobel::sobel,
};

fn bench_sobel(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sobel");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);

        // input image
        let image = Image::from_fn([*width, *height].into(), |row, col| {
            ((row * 31 + col * 17) % 256) as u8
        });

        let strategies = [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Rows {
                workers: 4,
                chunk_size: 16,
            },
            ExecutionStrategy::Columns {
                workers: 4,
                chunk_size: 16,
            },
            ExecutionStrategy::Blocks {
                workers: 4,
                blocks: 16,
            },
        ];

        for strategy in strategies {
            let executor = Executor::new(strategy).expect("valid strategy");
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), &parameter_string),
                &image,
                |b, i| b.iter(|| black_box(sobel(i, &executor))),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_sobel);
criterion_main!(benches);
