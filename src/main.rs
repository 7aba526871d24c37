use anyhow::{anyhow, Context, Result};
use chartdeck::aggregate::AggregationOp;
use chartdeck::chart::ChartType;
use chartdeck::configurator::ChartConfigurator;
use chartdeck::csv_reader;
use chartdeck::dashboard::{Dashboard, JsonFileStore};
use chartdeck::graph::{self, GraphConfig};
use chartdeck::parser::parse_predicate;
use chartdeck::settings::Settings;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "chartdeck")]
#[command(about = "Filter, aggregate and chart CSV data", long_about = None)]
struct Args {
    #[arg(long = "config", global = true, help = "Settings file (TOML)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the rows of a CSV file that pass a filter
    Preview {
        file: PathBuf,

        #[arg(short = 'f', long = "filter", help = "Filter expression, e.g. \"sales > 6\"")]
        filter: Option<String>,

        #[arg(long = "limit", default_value = "20", help = "Maximum rows to print")]
        limit: usize,
    },

    /// Generate a chart from a CSV file
    Chart {
        file: PathBuf,

        #[arg(short = 'x', long = "x", required = true, help = "X-axis (category) column")]
        x_column: String,

        #[arg(short = 'y', long = "y", required = true, help = "Y-axis (numeric) column")]
        y_column: String,

        #[arg(short = 't', long = "type", default_value = "bar", help = "Chart type: bar, line or pie")]
        chart_type: ChartType,

        #[arg(short = 'a', long = "agg", default_value = "none", help = "Aggregation: none, sum, average, count, min or max")]
        aggregation: AggregationOp,

        #[arg(short = 'f', long = "filter", help = "Filter expression, e.g. \"sales > 6\"")]
        filter: Option<String>,

        #[arg(short = 'o', long = "output", help = "PNG output path (defaults to stdout)")]
        output: Option<PathBuf>,

        #[arg(long = "save", help = "Add the chart to the dashboard")]
        save: bool,

        #[arg(long = "width", default_value = "800", help = "Output width in pixels")]
        width: u32,

        #[arg(long = "height", default_value = "600", help = "Output height in pixels")]
        height: u32,
    },

    /// Manage saved charts
    Dashboard {
        #[command(subcommand)]
        action: DashboardAction,
    },
}

#[derive(Subcommand, Debug)]
enum DashboardAction {
    /// List saved charts
    List,
    /// Remove a saved chart by id
    Remove { id: i64 },
    /// Remove every saved chart
    Clear,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    match args.command {
        Command::Preview { file, filter, limit } => preview(&settings, &file, filter.as_deref(), limit),
        Command::Chart {
            file,
            x_column,
            y_column,
            chart_type,
            aggregation,
            filter,
            output,
            save,
            width,
            height,
        } => {
            let mut configurator = load(&settings, &file)?;
            if let Some(expr) = filter.as_deref() {
                apply_filter(&mut configurator, expr)?;
            }
            let x = resolve_column(&configurator, &x_column);
            let y = resolve_column(&configurator, &y_column);
            configurator.set_x_axis(Some(&x)).context("Failed to select X column")?;
            configurator.set_y_axis(Some(&y)).context("Failed to select Y column")?;
            configurator.set_chart_type(chart_type);
            configurator.set_aggregation(aggregation);
            settle(&mut configurator);

            configurator
                .generate(Instant::now())
                .context("Failed to generate chart")?;
            settle(&mut configurator);

            let chart = configurator
                .chart()
                .ok_or_else(|| anyhow!("Chart was not generated"))?;

            let config = GraphConfig {
                title: Some(chart.title()),
                width,
                height,
            };
            let png_bytes = graph::render_chart(&chart.render_request(), &config)
                .context("Failed to render chart")?;
            write_png(output.as_deref(), &png_bytes)?;

            if save {
                let mut dashboard = open_dashboard(&settings)?;
                let id = configurator
                    .add_to_dashboard(&mut dashboard)
                    .context("Failed to add chart to dashboard")?;
                eprintln!("Saved chart {} ({}/{})", id, dashboard.len(), dashboard.capacity());
            }
            Ok(())
        }
        Command::Dashboard { action } => {
            let mut dashboard = open_dashboard(&settings)?;
            match action {
                DashboardAction::List => {
                    if dashboard.is_empty() {
                        println!("No charts in dashboard.");
                    }
                    for saved in dashboard.list() {
                        println!("{}\t{}\t{} points", saved.id, saved.title(), saved.chart.data.len());
                    }
                }
                DashboardAction::Remove { id } => {
                    let removed = dashboard.remove(id).context("Failed to remove chart")?;
                    if !removed {
                        return Err(anyhow!("No chart with id {}", id));
                    }
                    println!("Removed chart {}", id);
                }
                DashboardAction::Clear => {
                    dashboard.clear().context("Failed to clear dashboard")?;
                    println!("Dashboard cleared");
                }
            }
            Ok(())
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn load(settings: &Settings, file: &Path) -> Result<ChartConfigurator> {
    let mut configurator = ChartConfigurator::from_settings(settings);
    configurator.set_parsing(true);
    let dataset = csv_reader::read_dataset(file)
        .with_context(|| format!("Failed to read CSV file '{}'", file.display()))?;
    let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
    configurator.load_dataset(dataset, name);
    Ok(configurator)
}

/// Header names match exactly first, then case-insensitively.
fn resolve_column(configurator: &ChartConfigurator, name: &str) -> String {
    configurator
        .dataset()
        .resolve_column(name)
        .unwrap_or(name)
        .to_string()
}

fn apply_filter(configurator: &mut ChartConfigurator, expr: &str) -> Result<()> {
    let predicate = parse_predicate(expr)?;
    let column = predicate
        .column
        .as_deref()
        .map(|c| resolve_column(configurator, c));
    configurator
        .set_filter_column(column.as_deref())
        .context("Failed to select filter column")?;
    configurator.set_filter_operator(predicate.operator);
    configurator.set_filter_value(predicate.value, Instant::now());
    Ok(())
}

/// Run pending timers to completion, sleeping until each deadline.
fn settle(configurator: &mut ChartConfigurator) {
    while let Some(deadline) = configurator.next_deadline() {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        configurator.tick(Instant::now());
    }
}

fn preview(settings: &Settings, file: &Path, filter: Option<&str>, limit: usize) -> Result<()> {
    let mut configurator = load(settings, file)?;
    if configurator.dataset().is_empty() {
        println!("No data loaded");
        return Ok(());
    }
    if let Some(expr) = filter {
        apply_filter(&mut configurator, expr)?;
        settle(&mut configurator);
    }

    let rows = configurator.filtered_rows();
    if rows.is_empty() {
        println!("No rows match this filter");
        return Ok(());
    }
    println!("{}", configurator.row_counts());

    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    writer
        .write_record(rows.columns())
        .context("Failed to write header")?;
    for row in rows.iter().take(limit) {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .context("Failed to write row")?;
    }
    writer.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn open_dashboard(settings: &Settings) -> Result<Dashboard<JsonFileStore>> {
    let store = JsonFileStore::new(&settings.dashboard_path);
    Dashboard::open(store, settings.dashboard_capacity).with_context(|| {
        format!(
            "Failed to open dashboard '{}'",
            settings.dashboard_path.display()
        )
    })
}

fn write_png(output: Option<&Path>, png_bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => fs::write(path, png_bytes)
            .with_context(|| format!("Failed to write PNG to '{}'", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(png_bytes)
                .context("Failed to write PNG to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
            Ok(())
        }
    }
}
