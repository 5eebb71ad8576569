use argh::FromArgs;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use edgepar::{
    image::Image,
    imgproc::{
        canny::{CannyConfig, CannyPipeline},
        parallel::{ExecutionStrategy, Executor, StrategyBuilder},
        sobel, FilterOutput,
    },
    io,
};

/// Edge filter to benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FilterKind {
    Sobel,
    Canny,
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sobel" => Ok(FilterKind::Sobel),
            "canny" => Ok(FilterKind::Canny),
            _ => Err(format!("Invalid filter: {s}")),
        }
    }
}

#[derive(FromArgs)]
/// Benchmark the serial and parallel edge filters over a directory of images
struct Args {
    /// directory containing the input images
    #[argh(option)]
    input_dir: PathBuf,

    /// the filter to run: sobel or canny
    #[argh(option, default = "FilterKind::Sobel")]
    filter: FilterKind,

    /// number of passes over the directory to average
    #[argh(option, default = "1")]
    repetitions: usize,

    /// number of worker threads of the parallel strategies
    #[argh(option, default = "16")]
    workers: usize,

    /// rows or columns per scheduling unit
    #[argh(option, default = "16")]
    chunk_size: usize,

    /// number of blocks of the block strategy
    #[argh(option, default = "16")]
    blocks: usize,

    /// side length of the canny gaussian kernel
    #[argh(option, default = "3")]
    kernel_size: usize,

    /// sigma of the canny gaussian kernel
    #[argh(option, default = "1.0")]
    sigma: f64,

    /// optional directory where the serial results are written
    #[argh(option)]
    output_dir: Option<PathBuf>,
}

/// A decoded input together with its origin.
struct Input {
    path: PathBuf,
    image: Image<u8>,
}

fn load_inputs(dir: &Path) -> Result<Vec<Input>, Box<dyn std::error::Error>> {
    let mut paths = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    paths.sort();

    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        match io::read_image_gray8(&path) {
            Ok(image) => inputs.push(Input { path, image }),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(inputs)
}

fn run_filter(
    filter: FilterKind,
    pipeline: &CannyPipeline,
    input: &Input,
    executor: &Executor,
) -> Option<FilterOutput> {
    let result = match filter {
        FilterKind::Sobel => sobel::sobel(&input.image, executor),
        FilterKind::Canny => pipeline.compute(&input.image, executor),
    };

    match result {
        Ok(output) => {
            for fault in &output.faults {
                log::warn!("{fault} in file: {}", input.path.display());
            }
            Some(output)
        }
        Err(e) => {
            log::warn!("{e} in file: {}", input.path.display());
            None
        }
    }
}

/// Average total computation time over the inputs, per repetition.
fn benchmark(
    args: &Args,
    pipeline: &CannyPipeline,
    inputs: &[Input],
    strategy: ExecutionStrategy,
) -> Result<Duration, Box<dyn std::error::Error>> {
    let executor = Executor::new(strategy)?;
    let mut total = Duration::ZERO;

    for _ in 0..args.repetitions {
        for input in inputs {
            if let Some(output) = run_filter(args.filter, pipeline, input, &executor) {
                total += output.elapsed;
            }
        }
    }

    Ok(total / args.repetitions.max(1) as u32)
}

fn save_serial_results(
    args: &Args,
    pipeline: &CannyPipeline,
    inputs: &[Input],
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;
    let executor = Executor::serial();
    let suffix = format!("{:?}", args.filter).to_lowercase();

    for input in inputs {
        let Some(output) = run_filter(args.filter, pipeline, input, &executor) else {
            continue;
        };
        let stem = input
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let file_path = output_dir.join(format!("{stem}_{suffix}.png"));
        io::write_image_gray8(&file_path, &output.image)?;
        log::info!("wrote {}", file_path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let pipeline = CannyPipeline::new(CannyConfig::new(args.kernel_size, args.sigma))?;
    if args.filter == FilterKind::Canny {
        log::info!("canny parameters: {:?}", pipeline.config());
    }
    let builder = StrategyBuilder::new()
        .workers(args.workers)
        .chunk_size(args.chunk_size)
        .block_count(args.blocks);

    let strategies = [
        ExecutionStrategy::Serial,
        builder.rows()?,
        builder.columns()?,
        builder.blocks()?,
    ];

    let inputs = load_inputs(&args.input_dir)?;
    println!(
        "Running {:?} over {} images from {}",
        args.filter,
        inputs.len(),
        args.input_dir.display()
    );

    let mut serial_time = None;
    for strategy in strategies {
        let elapsed = benchmark(&args, &pipeline, &inputs, strategy)?;
        let millis = elapsed.as_secs_f64() * 1e3;

        match serial_time {
            None => {
                println!(
                    "[{}] Computation time: {millis:.3} [msec]",
                    strategy.name().to_uppercase()
                );
                serial_time = Some(elapsed);
            }
            Some(serial) => {
                let speedup = serial.as_secs_f64() / elapsed.as_secs_f64().max(f64::EPSILON);
                println!(
                    "[{}] Computation time: {millis:.3} [msec] - speedup: {speedup:.2}x ({strategy})",
                    strategy.name().to_uppercase()
                );
            }
        }
    }

    if let Some(output_dir) = &args.output_dir {
        save_serial_results(&args, &pipeline, &inputs, output_dir)?;
    }

    Ok(())
}
