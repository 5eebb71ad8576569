use edgepar_image::Image;
use edgepar_imgproc::{
    canny::{CannyConfig, CannyPipeline},
    parallel::{ExecutionStrategy, Executor, StrategyBuilder},
    sobel::{sobel, sobel_with_strategy},
    FilterError,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_image(width: usize, height: usize, seed: u64) -> Image<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    Image::from_fn([width, height].into(), |_, _| rng.random::<u8>())
}

fn strategies() -> Vec<ExecutionStrategy> {
    let mut strategies = Vec::new();
    for workers in [1, 2, 3, 8] {
        for chunk_size in [1, 2, 5, 16, 1000] {
            strategies.push(ExecutionStrategy::Rows {
                workers,
                chunk_size,
            });
            strategies.push(ExecutionStrategy::Columns {
                workers,
                chunk_size,
            });
        }
        for blocks in [1, 2, 5, 8, 9, 16, 32, 64] {
            strategies.push(ExecutionStrategy::Blocks { workers, blocks });
        }
    }
    strategies
}

#[test]
fn sobel_decompositions_match_serial() -> Result<(), FilterError> {
    for (width, height, seed) in [(3, 3, 0), (17, 5, 1), (40, 33, 2), (64, 48, 3)] {
        let src = random_image(width, height, seed);
        let reference = sobel(&src, &Executor::serial())?;
        assert!(reference.is_complete());

        for strategy in strategies() {
            let output = sobel_with_strategy(&src, strategy)?;
            assert!(output.is_complete());
            assert_eq!(
                output.image, reference.image,
                "{width}x{height} with {strategy}"
            );
        }
    }
    Ok(())
}

#[test]
fn canny_decompositions_match_serial() -> Result<(), FilterError> {
    let src = random_image(45, 31, 7);
    for config in [CannyConfig::default(), CannyConfig::new(5, 1.4)] {
        let pipeline = CannyPipeline::new(config)?;
        let reference = pipeline.run_stages(&src, &Executor::serial())?;

        for strategy in strategies() {
            let executor = Executor::new(strategy)?;
            let stages = pipeline.run_stages(&src, &executor)?;
            assert_eq!(stages, reference, "{config:?} with {strategy}");
        }
    }
    Ok(())
}

#[test]
fn single_worker_single_chunk_is_serial() -> Result<(), FilterError> {
    let src = random_image(23, 19, 11);
    let reference = sobel(&src, &Executor::serial())?;

    let rows = StrategyBuilder::new().workers(1).chunk_size(1).rows()?;
    let columns = StrategyBuilder::new().workers(1).chunk_size(1).columns()?;
    assert_eq!(sobel_with_strategy(&src, rows)?.image, reference.image);
    assert_eq!(sobel_with_strategy(&src, columns)?.image, reference.image);
    Ok(())
}

#[test]
fn executor_is_reusable_across_images() -> Result<(), FilterError> {
    let executor = Executor::new(ExecutionStrategy::Blocks {
        workers: 4,
        blocks: 16,
    })?;
    for seed in 0..4 {
        let src = random_image(30 + seed as usize, 20, seed);
        let reference = sobel(&src, &Executor::serial())?;
        assert_eq!(sobel(&src, &executor)?.image, reference.image);
    }
    Ok(())
}
