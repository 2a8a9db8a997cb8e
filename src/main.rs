use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::imageops::FilterType;
use modnet_matte::{run_matting, MattingConfig, ModelHandle, DEFAULT_REF_SIZE};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image path
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Path to the matting model (ONNX file)
    #[arg(short, long)]
    model: PathBuf,

    /// Output image path (png, tiff or webp)
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Reference size the working resolution is derived from
    #[arg(long, default_value_t = DEFAULT_REF_SIZE)]
    ref_size: u32,

    /// Resampling kernel for the working-resolution resize
    #[arg(long, value_enum, default_value_t = Filter::Lanczos3)]
    filter: Filter,

    /// ONNX Runtime intra-op threads
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Also save the alpha matte as a grayscale image
    #[arg(long, value_name = "PATH")]
    matte: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Filter> for FilterType {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Err(err) = run(args).await {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(args: Args) -> Result<()> {
    let config = MattingConfig {
        ref_size: args.ref_size,
        resize_filter: args.filter.into(),
        intra_threads: args.threads,
        matte_output: args.matte,
        ..MattingConfig::default()
    };
    config.validate().context("Invalid configuration")?;

    tracing::info!("Reference size: {}", config.ref_size);

    let model = ModelHandle::load(&args.model, config.intra_threads)
        .await
        .context("Failed to load matting model")?;

    run_matting(&args.input, &model, &args.output, &config)
        .await
        .with_context(|| format!("Failed to matte {}", args.input.display()))?;

    Ok(())
}
