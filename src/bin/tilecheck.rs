use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tilecheck::harness::fixtures::{fixture_transport, write_fixture_set};
use tilecheck::{
    DiagnosticChannel, DiffToolKind, DirTransport, EncodingPolicy, HarnessConfig, HarnessMode,
    ImageComparator, RenderOptions, RenderPipeline, ResourceProvider, Transport,
    VerificationHarness,
};

#[derive(Parser, Debug)]
#[command(name = "tilecheck", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the gzip fixture set (scene document plus one compressed tile).
    Fixtures(FixturesArgs),
    /// Render a scene document to a PNG.
    Render(RenderArgs),
    /// Compare a candidate PNG with a baseline.
    Compare(CompareArgs),
    /// Run the built-in gzip scenarios.
    Verify(VerifyArgs),
}

#[derive(Parser, Debug)]
struct FixturesArgs {
    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Scene document JSON.
    #[arg(long)]
    style: PathBuf,

    /// Directory URLs are resolved against (defaults to the scene document's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Hand tile bodies to the decoder without inflating them.
    #[arg(long)]
    raw_tiles: bool,

    /// Output width in pixels.
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    /// Candidate PNG.
    #[arg(long)]
    actual: PathBuf,

    /// Baseline PNG.
    #[arg(long)]
    expected: PathBuf,

    /// Diff image output path.
    #[arg(long)]
    diff: PathBuf,

    /// Largest normalized difference that still passes.
    #[arg(long, default_value_t = 0.001)]
    tolerance: f64,

    /// Comparison tool.
    #[arg(long, value_enum, default_value_t = ToolChoice::Builtin)]
    tool: ToolChoice,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    /// Fixture directory served as `http://localhost:2900` (in-memory fixtures when omitted).
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Harness config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Results directory (overrides config and environment).
    #[arg(long)]
    results: Option<PathBuf>,

    /// Record baselines instead of comparing.
    #[arg(long)]
    update: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ToolChoice {
    Builtin,
    Imagemagick,
}

impl From<ToolChoice> for DiffToolKind {
    fn from(c: ToolChoice) -> Self {
        match c {
            ToolChoice::Builtin => DiffToolKind::Builtin,
            ToolChoice::Imagemagick => DiffToolKind::ImageMagick,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Fixtures(args) => cmd_fixtures(args),
        Command::Render(args) => cmd_render(args).await,
        Command::Compare(args) => cmd_compare(args).await,
        Command::Verify(args) => cmd_verify(args).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn cmd_fixtures(args: FixturesArgs) -> anyhow::Result<ExitCode> {
    write_fixture_set(&args.out)?;
    eprintln!("wrote fixture set to {}", args.out.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<ExitCode> {
    let json = tokio::fs::read_to_string(&args.style)
        .await
        .with_context(|| format!("read scene document '{}'", args.style.display()))?;
    let root = match args.root {
        Some(r) => r,
        None => args
            .style
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };
    let policy = if args.raw_tiles {
        EncodingPolicy::raw_tiles()
    } else {
        EncodingPolicy::decompress_all()
    };
    let provider = ResourceProvider::new(Arc::new(DirTransport::new(root)), policy);
    let mut pipeline = RenderPipeline::new(provider);
    pipeline.load_scene(&json)?;

    let diagnostics = DiagnosticChannel::new();
    let _printer = diagnostics.subscribe(|d| eprintln!("{d}"));
    let opts = RenderOptions {
        width: args.width,
        height: args.height,
        ..RenderOptions::default()
    };
    let frame = pipeline.render(&opts, &diagnostics).await?;
    tilecheck::render::frame::write_png(&frame, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_compare(args: CompareArgs) -> anyhow::Result<ExitCode> {
    let comparator = ImageComparator::for_kind(args.tool.into());
    let result = comparator
        .compare(&args.actual, &args.expected, &args.diff, args.tolerance)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_verify(args: VerifyArgs) -> anyhow::Result<ExitCode> {
    let mut config = match &args.config {
        Some(p) => HarnessConfig::from_path(p)?,
        None => HarnessConfig::default(),
    }
    .with_process_env()?;
    if let Some(results) = args.results {
        config.results_dir = results;
    }
    if args.update {
        config.mode = HarnessMode::RecordBaseline;
    }

    let transport: Arc<dyn Transport> = match args.fixtures {
        Some(dir) => Arc::new(DirTransport::new(dir)),
        None => Arc::new(fixture_transport()),
    };
    let harness = VerificationHarness::new(config, transport);
    let reports = harness.run_all(&tilecheck::gzip_scenarios()).await?;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        eprintln!("{failed} of {} scenario(s) failed", reports.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
