// Command-line entry point.
//
// Every command follows the same flow: read the dashboard config, load each
// scheme's sheet (failed sheets become empty datasets), then run one of the
// views over the in-memory data and print it, optionally saving a copy.
use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use scheme_monitor::aggregate::{block_drilldown, district_summary};
use scheme_monitor::config::DashboardConfig;
use scheme_monitor::error::Result;
use scheme_monitor::identity::resolve_identity_keys;
use scheme_monitor::metric::infer_dataset_metric;
use scheme_monitor::snapshot::{headline_value, SnapshotStore};
use scheme_monitor::types::{
    BlockAggregateRow, BriefLevel, BriefRow, CardStatus, Datasets, SchemeSummaryRow,
};
use scheme_monitor::{briefs, loader, output, report, util};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scheme_monitor", about = "District scheme progress monitoring")]
struct Cli {
    /// Dashboard config (JSON). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// District headline per scheme.
    Summary {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Block drill-down for one scheme.
    Blocks {
        #[arg(long)]
        scheme: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// GP or block intervention briefs.
    Briefs {
        #[arg(long, value_enum, default_value_t = Level::Gp)]
        level: Level,
        /// Restrict to one scheme instead of all.
        #[arg(long)]
        scheme: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Executive report for one block across active schemes.
    Report {
        #[arg(long)]
        block: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Record today's headline values and show the change since the previous day.
    Snapshot {
        /// Snapshot store (JSON), created on first use.
        #[arg(long, default_value = "snapshots.json")]
        snapshot: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Gp,
    Block,
}

impl From<Level> for BriefLevel {
    fn from(l: Level) -> Self {
        match l {
            Level::Gp => BriefLevel::Gp,
            Level::Block => BriefLevel::Block,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(config: &DashboardConfig) -> Datasets {
    let data = loader::load_datasets(config);
    let rows: usize = data.values().map(|d| d.len()).sum();
    let with_data = data.values().filter(|d| !d.is_empty()).count();
    info!(
        "Processing sheets... ({} rows across {} of {} schemes)",
        util::format_int(rows),
        with_data,
        data.len()
    );
    data
}

fn status_label(status: CardStatus) -> &'static str {
    match status {
        CardStatus::Good => "On track",
        CardStatus::Moderate => "Moderate",
        CardStatus::Critical => "Critical",
        CardStatus::Unknown => "-",
    }
}

fn handle_summary(config: &DashboardConfig, data: &Datasets, out: Option<PathBuf>) -> Result<()> {
    let rows: Vec<SchemeSummaryRow> = config
        .active_schemes()
        .iter()
        .map(|scheme| {
            let dataset = data.get(scheme).cloned().unwrap_or_default();
            let metric = infer_dataset_metric(&dataset);
            let result = district_summary(&dataset);
            let unit = if result.is_percentage { "%" } else { "" };
            SchemeSummaryRow {
                scheme: scheme.clone(),
                metric: metric.as_ref().map_or("-".to_string(), |m| m.label.clone()),
                kind: metric.as_ref().map_or("-".to_string(), |m| format!("{:?}", m.kind())),
                value: format!("{}{}", result.value, if result.value.number().is_some() { unit } else { "" }),
                status: status_label(result.status()).to_string(),
            }
        })
        .collect();
    output::preview_table("District Summary", Some("one headline per scheme"), &rows, rows.len());
    if let Some(path) = out {
        output::write_csv(&path, &rows)?;
        println!("(Full table exported to {})", path.display());
    }
    Ok(())
}

fn handle_blocks(config: &DashboardConfig, data: &Datasets, scheme: &str, out: Option<PathBuf>) -> Result<()> {
    let scheme = config.require_scheme(scheme)?;
    let dataset = data.get(scheme).cloned().unwrap_or_default();
    let Some(metric) = infer_dataset_metric(&dataset) else {
        println!("No progress metric found for {}.\n", scheme);
        return Ok(());
    };
    let keys = resolve_identity_keys(&dataset.columns());
    let rows: Vec<BlockAggregateRow> = block_drilldown(&dataset, &metric, &keys)
        .into_iter()
        .map(|b| BlockAggregateRow {
            block: b.block,
            value: match b.value.number() {
                Some(_) => format!("{}{}", b.value, metric.unit()),
                None => b.value.to_string(),
            },
            rows: b.rows,
        })
        .collect();
    let title = format!("{} - {} by Block", scheme, metric.label);
    output::preview_table(&title, None, &rows, rows.len());
    if let Some(path) = out {
        output::write_csv(&path, &rows)?;
        println!("(Full table exported to {})", path.display());
    }
    Ok(())
}

fn handle_briefs(
    config: &DashboardConfig,
    data: &Datasets,
    level: Level,
    scheme: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let schemes = match scheme {
        Some(s) => vec![config.require_scheme(&s)?.clone()],
        None => config.active_schemes().to_vec(),
    };
    let generated = briefs::generate_briefs(&schemes, data, &config.nodal_officers, level.into());
    let table: Vec<BriefRow> = generated.iter().map(BriefRow::from).collect();
    output::preview_table("Action Hub", Some("generated briefs"), &table, table.len());
    for b in &generated {
        println!("{}\n", b.message);
    }
    if let Some(path) = out {
        output::write_json(&path, &generated)?;
        println!("(Briefs exported to {})", path.display());
    }
    Ok(())
}

fn handle_report(config: &DashboardConfig, data: &Datasets, block: &str, out: Option<PathBuf>) -> Result<()> {
    let text = report::generate_report(
        block,
        &config.groups(),
        data,
        config.active_schemes(),
        Local::now().date_naive(),
    );
    println!("{}\n", text);
    if let Some(path) = out {
        std::fs::write(&path, &text)?;
        println!("(Report saved to {})", path.display());
    }
    Ok(())
}

fn handle_snapshot(config: &DashboardConfig, data: &Datasets, store_path: PathBuf) -> Result<()> {
    let mut store = SnapshotStore::load(&store_path)?;
    let today = Local::now().date_naive();
    let now = Utc::now();
    for scheme in config.active_schemes() {
        let Some(dataset) = data.get(scheme).filter(|d| !d.is_empty()) else {
            continue;
        };
        let Some(value) = headline_value(dataset, config.headline_marker) else {
            continue;
        };
        let delta = store.observe(scheme, value, today, now);
        let change = delta
            .change
            .map(|c| format!("{}{}", if c >= 0.0 { "+" } else { "" }, util::format_grouped(c)))
            .unwrap_or_else(|| "n/a".to_string());
        println!("{}: {} (since yesterday: {})", scheme, util::format_grouped(delta.current), change);
    }
    store.save(&store_path)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    let data = load(&config);
    match cli.command {
        Command::Summary { out } => handle_summary(&config, &data, out),
        Command::Blocks { scheme, out } => handle_blocks(&config, &data, &scheme, out),
        Command::Briefs { level, scheme, out } => handle_briefs(&config, &data, level, scheme, out),
        Command::Report { block, out } => handle_report(&config, &data, &block, out),
        Command::Snapshot { snapshot } => handle_snapshot(&config, &data, snapshot),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
