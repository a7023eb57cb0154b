use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use audition_match::{write_reports, Allocator, Config, SemesterFiles, TracingObserver};

#[derive(Parser)]
#[command(
    name = "audition-match",
    about = "Cast dancers into pieces from audition rankings",
    version
)]
struct Cli {
    /// Semester tag used in the input file names (e.g. SPRING18)
    #[arg(short, long)]
    semester: String,
    /// Directory holding CHOREO_/DANCER_/SIGN_IN_<semester>.csv
    #[arg(short, long, default_value = ".")]
    input_dir: PathBuf,
    /// Where to write the result sheets (overrides the config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// TOML file with schedule and output settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log every assignment and pruning decision
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "audition_match=debug" } else { "audition_match=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let files = SemesterFiles::new(&cli.input_dir, &cli.semester);
    let market = files
        .load()
        .with_context(|| format!("failed to load semester {}", cli.semester))?;

    let market = if cli.verbose {
        let mut allocator = Allocator::with_observer(market, config.schedule, TracingObserver);
        allocator.run();
        allocator.into_market()
    } else {
        let mut allocator = Allocator::new(market, config.schedule);
        allocator.run();
        allocator.into_market()
    };

    let summary = write_reports(&market, &config.output_dir)?;
    println!(
        "Done! {} of {} pieces filled, {} dancers cast, {} unassigned (see {})",
        summary.filled_pieces,
        summary.pieces,
        summary.assigned_dancers,
        summary.unassigned_dancers,
        config.output_dir.display()
    );
    Ok(())
}
