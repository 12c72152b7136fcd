use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fumen_editor_core::{beat_lines, EditorConfig, EditorSession, Fumen, FumenError, TGrid};
use tracing_subscriber::EnvFilter;

fn main() -> fumen_editor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { chart, config } => run_inspect(&chart, config.as_deref()),
        Commands::Convert {
            chart,
            config,
            seconds,
            unit,
            grid,
        } => run_convert(&chart, config.as_deref(), seconds, unit, grid),
        Commands::Normalize { input, output } => run_normalize(&input, &output),
    }
}

fn load_config(path: Option<&Path>) -> fumen_editor_core::Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::load(path),
        None => Ok(EditorConfig::default()),
    }
}

fn run_inspect(chart: &Path, config: Option<&Path>) -> fumen_editor_core::Result<()> {
    tracing::info!(?chart, "inspecting chart");

    let session = EditorSession::open(chart, load_config(config)?)?;
    let list = session.display_list()?;
    let beats_per_unit = session.config().timeline.beats_per_unit;

    let (title, tempo_changes, meter_changes, lanes, measures) = session.read(|fumen| {
        let end = fumen.max_tgrid().unwrap_or(TGrid::ZERO);
        let measures = beat_lines(fumen.meter_map(), TGrid::ZERO, end, beats_per_unit)
            .map(|lines| lines.iter().filter(|line| line.is_measure).count());
        (
            fumen.meta().title.clone(),
            fumen.tempo_map().changes().len(),
            fumen.meter_map().changes().len(),
            fumen.lane_polylines().len(),
            measures,
        )
    })?;

    println!("title: {title}");
    println!("tempo changes: {tempo_changes}, meter changes: {meter_changes}");
    println!("lanes: {lanes}, measures: {}", measures?);
    for (kind, count) in list.count_by_kind() {
        println!("  {kind}: {count}");
    }
    for item in list.items() {
        let x = item.x.map_or_else(|| "-".to_string(), |x| format!("{x:.1}"));
        println!(
            "{} {:?} at {} -> ({x}, {:.1})",
            item.kind, item.element, item.tgrid, item.y
        );
    }
    Ok(())
}

fn run_convert(
    chart: &Path,
    config: Option<&Path>,
    seconds: Option<f64>,
    unit: Option<i64>,
    grid: i32,
) -> fumen_editor_core::Result<()> {
    let session = EditorSession::open(chart, load_config(config)?)?;

    match (seconds, unit) {
        (Some(seconds), None) => {
            let tgrid = session.tgrid_at(seconds)?;
            tracing::debug!(seconds, %tgrid, "converted seconds to chart position");
            println!("{tgrid}");
        }
        (None, Some(unit)) => {
            let tgrid = TGrid::new(unit, grid)?;
            let seconds = session.seconds_at(tgrid)?;
            tracing::debug!(%tgrid, seconds, "converted chart position to seconds");
            println!("{seconds:.6}");
        }
        _ => return Err(FumenError::InvalidInput("pass either --seconds or --unit")),
    }
    Ok(())
}

fn run_normalize(input: &PathBuf, output: &PathBuf) -> fumen_editor_core::Result<()> {
    tracing::info!(?input, ?output, "normalizing chart");
    let mut fumen = Fumen::load(input)?;
    fumen.setup();
    fumen.save(output)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm game chart editor tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a summary and every displayable element of a chart.
    Inspect {
        /// Chart snapshot to load.
        chart: PathBuf,
        /// Optional editor config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Convert between seconds and chart positions using the chart's tempo map.
    Convert {
        /// Chart snapshot providing the tempo map.
        chart: PathBuf,
        /// Optional editor config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds to convert into a chart position.
        #[arg(long, conflicts_with = "unit")]
        seconds: Option<f64>,
        /// Coarse unit of the chart position to convert into seconds.
        #[arg(long, allow_hyphen_values = true)]
        unit: Option<i64>,
        /// Fine grid of the chart position.
        #[arg(long, default_value_t = 0)]
        grid: i32,
    },
    /// Load a chart, normalize it, and write it back out.
    Normalize {
        /// Chart snapshot to read.
        input: PathBuf,
        /// Output path for the normalized snapshot.
        output: PathBuf,
    },
}
