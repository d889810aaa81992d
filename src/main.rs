use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use bench_browser::log_collector::get_global_logs_path;
use bench_browser::results::timestamp::parse_date;
use bench_browser::{
    AppError, BrowserSettings, EmptySelection, Facet, LogCollector, ResultsBrowser,
    SettingsManager,
};

/// Query llama.cpp benchmark results across backends
#[derive(Parser, Debug)]
#[command(name = "bench_browser", version, about)]
struct Cli {
    /// Results JSON file (defaults to the path in settings)
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Settings file (defaults to ~/.config/bench-browser/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory for log files (defaults to the path in settings)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Context key to show (e.g. default, longctx32768)
    #[arg(short, long)]
    context: Option<String>,

    /// Models to include (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    model: Vec<String>,

    /// Quantizations to include
    #[arg(long, value_delimiter = ',')]
    quant: Vec<String>,

    /// Kernel versions to include
    #[arg(long, value_delimiter = ',')]
    kernel: Vec<String>,

    /// linux-firmware versions to include
    #[arg(long, value_delimiter = ',')]
    firmware: Vec<String>,

    /// Run ids to include
    #[arg(long, value_delimiter = ',')]
    run: Vec<String>,

    /// Backend columns to show, in order
    #[arg(long, value_delimiter = ',')]
    backend: Vec<String>,

    /// Minimum model size in billions of parameters
    #[arg(long)]
    min_size: Option<f64>,

    /// Maximum model size in billions of parameters
    #[arg(long)]
    max_size: Option<f64>,

    /// Earliest run date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<String>,

    /// Latest run date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    until: Option<String>,

    /// Split rows by kernel version
    #[arg(long)]
    group_kernel: bool,

    /// Split rows by linux-firmware version
    #[arg(long)]
    group_firmware: bool,

    /// Treat an empty selection as "no restriction"
    #[arg(long)]
    empty_means_all: bool,

    /// Print facet options and contexts instead of the table
    #[arg(long)]
    facets: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Serialize)]
struct ContextOption {
    key: String,
    label: String,
    tokens: Option<u64>,
    rows: usize,
}

#[derive(Serialize)]
struct RunOption {
    id: String,
    label: String,
}

#[derive(Serialize)]
struct FacetListing<'a> {
    models: &'a std::collections::BTreeSet<String>,
    quants: &'a std::collections::BTreeSet<String>,
    kernels: &'a std::collections::BTreeSet<String>,
    firmwares: &'a std::collections::BTreeSet<String>,
    runs: Vec<RunOption>,
    backends: &'a [String],
    contexts: Vec<ContextOption>,
    size_bounds: Option<bench_browser::results::Bounds<f64>>,
    date_bounds: Option<bench_browser::results::Bounds<i64>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[Main] FATAL: {}", e.user_message());
            log::logger().flush();
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<BrowserSettings, AppError> {
    match &cli.settings {
        Some(path) => Ok(SettingsManager::load_from(path)?),
        None => Ok(SettingsManager::load().unwrap_or_else(|e| {
            eprintln!("[Main] WARNING: {}, using default settings", e);
            BrowserSettings::default()
        })),
    }
}

fn start_logging(cli: &Cli, settings: &BrowserSettings) -> Result<LogCollector, AppError> {
    let log_dir = match &cli.log_dir {
        Some(dir) => dir.clone(),
        None if !settings.log_dir.is_empty() => PathBuf::from(&settings.log_dir),
        None => get_global_logs_path().map_err(AppError::Logging)?,
    };
    let level = if cli.debug || settings.debug_logging {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let collector = LogCollector::new(&log_dir, level).map_err(AppError::Logging)?;
    collector.install().map_err(AppError::Logging)?;
    log::info!("[Main] bench_browser {} logging to {}", bench_browser::VERSION, collector.log_path().display());
    Ok(collector)
}

fn apply_flags(browser: &mut ResultsBrowser, cli: &Cli) -> Result<(), AppError> {
    if let Some(context) = &cli.context {
        browser.set_context(context)?;
    }

    let selections = [
        (Facet::Model, &cli.model),
        (Facet::Quant, &cli.quant),
        (Facet::Kernel, &cli.kernel),
        (Facet::Firmware, &cli.firmware),
        (Facet::Run, &cli.run),
    ];
    for (facet, values) in selections {
        if !values.is_empty() {
            let values = values.iter().map(|v| match facet {
                Facet::Quant => v.to_uppercase(),
                _ => v.clone(),
            });
            browser.set_selection(facet, values);
        }
    }

    if !cli.backend.is_empty() {
        for env in &cli.backend {
            browser.set_backend_visible(env, true)?;
        }
        browser.set_backend_order(&cli.backend);
        let hidden: Vec<String> = browser
            .backend_order()
            .iter()
            .filter(|env| !cli.backend.contains(env))
            .cloned()
            .collect();
        for env in hidden {
            browser.set_backend_visible(&env, false)?;
        }
    }

    if cli.min_size.is_some() || cli.max_size.is_some() {
        let bounds = browser.size_bounds();
        let lo = cli.min_size.or(bounds.map(|b| b.min)).unwrap_or(0.0);
        let hi = cli.max_size.or(bounds.map(|b| b.max)).unwrap_or(f64::MAX);
        browser.set_size_range(lo, hi)?;
    }

    if cli.since.is_some() || cli.until.is_some() {
        let start = cli.since.as_deref().map(parse_date).transpose()?;
        let end = cli.until.as_deref().map(parse_date).transpose()?;
        browser.set_date_range(start, end)?;
    }

    if cli.group_kernel {
        browser.set_group_by_kernel(true);
    }
    if cli.group_firmware {
        browser.set_group_by_firmware(true);
    }
    if cli.empty_means_all {
        browser.set_empty_selection(EmptySelection::MatchAll);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| AppError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_facets(browser: &ResultsBrowser) -> Result<(), AppError> {
    let facets = browser.facets();
    let listing = FacetListing {
        models: &facets.models,
        quants: &facets.quants,
        kernels: &facets.kernels,
        firmwares: &facets.firmwares,
        runs: facets
            .runs
            .iter()
            .map(|id| RunOption {
                id: id.clone(),
                label: browser.run_label(id),
            })
            .collect(),
        backends: browser.backend_order(),
        contexts: browser
            .contexts()
            .into_iter()
            .map(|c| ContextOption {
                key: c.key.clone(),
                label: c.label(),
                tokens: c.effective_tokens(),
                rows: c.row_count(),
            })
            .collect(),
        size_bounds: browser.size_bounds(),
        date_bounds: browser.date_bounds(),
    };
    print_json(&listing)
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings = load_settings(&cli)?;
    let collector = start_logging(&cli, &settings)?;

    let results_path = cli
        .results
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.results_path));
    let mut browser = ResultsBrowser::from_file(&results_path)?;
    browser.apply_settings(&settings);
    apply_flags(&mut browser, &cli)?;

    if cli.facets {
        print_facets(&browser)?;
    } else {
        let output = browser.render();
        if output.is_empty() {
            log::info!("[Main] No rows match the current filters");
            eprintln!("No data for the current filters (context '{}')", output.context);
        }
        print_json(&output)?;
    }

    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }
    Ok(())
}
