//! Domain Price CLI Application
//!
//! Finds the cheapest registrar for a domain, or the cheapest TLD variant of
//! a name, on top of domain-price-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use domain_price_lib::{
    get_available_presets, get_preset_tlds_with_custom, load_env_config, parse_duration_string,
    ConfigManager, DomainPriceError, FileConfig, Operation, PriceConfig, TaskEvent, TaskOutput,
    TaskRunner, TldSweeper,
};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit status when an offer was found.
const EXIT_FOUND: i32 = 0;
/// Exit status when no registrar offered a price.
const EXIT_NOT_FOUND: i32 = 1;
/// Exit status for usage and configuration errors.
const EXIT_USAGE: i32 = 2;

/// CLI arguments for domain-price
#[derive(Parser, Debug)]
#[command(name = "domain-price")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find the cheapest registrar and TLD for a domain name")]
#[command(
    long_about = "Query several registrar pricing APIs at once and report the cheapest yearly price.\n\nA name with a dot (example.com) is priced across registrars. A bare name, or any of --sweep, --tld, --preset, compares TLD variants of it."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain name (example.com) or base name (example)
    #[arg(value_name = "NAME", required_unless_present = "list_presets", help_heading = "Domain Selection")]
    pub name: Option<String>,

    /// TLDs to compare (comma-separated or multiple -t flags)
    #[arg(short = 't', long = "tld", value_name = "TLD", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Domain Selection")]
    pub tlds: Option<Vec<String>>,

    /// Use a predefined TLD preset (use --list-presets to see all)
    #[arg(long = "preset", value_name = "NAME", help_heading = "Domain Selection")]
    pub preset: Option<String>,

    /// Compare TLD variants even when NAME already has a TLD
    #[arg(short = 's', long = "sweep", help_heading = "Domain Selection")]
    pub sweep: bool,

    /// List all available TLD presets and exit
    #[arg(long = "list-presets", help_heading = "Domain Selection")]
    pub list_presets: bool,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Max domains checked at once during a sweep (1-32)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-request timeout (e.g. "5s", "1m")
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Reporting currency (e.g. EUR, USD)
    #[arg(long = "currency", value_name = "CODE", help_heading = "Output Format")]
    pub currency: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(EXIT_USAGE);
    }

    init_logging(args.verbose);
    let info = domain_price_lib::info();
    debug!(version = info.version, backends = ?info.features, "domain-price starting");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_USAGE);
        }
    };

    if args.list_presets {
        print_presets(&config);
        return;
    }

    let operation = match select_operation(&args, &config) {
        Ok(operation) => operation,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_USAGE);
        }
    };

    process::exit(run(&args, &config, operation).await);
}

fn validate_args(args: &Args) -> Result<(), String> {
    // --list-presets is self-contained, skip other validation
    if args.list_presets {
        return Ok(());
    }

    if args.tlds.is_some() && args.preset.is_some() {
        return Err(
            "Cannot specify multiple TLD sources. Use only one of: -t/--tld or --preset"
                .to_string(),
        );
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 32 {
            return Err("Concurrency must be between 1 and 32".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_duration_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '2m'",
                timeout
            ));
        }
    }

    if let Some(currency) = &args.currency {
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Invalid currency code '{}'", currency));
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over the defaults.
fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "domain_price=debug,domain_price_lib=debug"
    } else {
        "domain_price=info,domain_price_lib=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

/// Resolve configuration with precedence: defaults < file < env < CLI.
fn build_config(args: &Args) -> Result<PriceConfig, DomainPriceError> {
    let manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    let config_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config = match config_path {
        Some(path) => manager.load_file(&path)?,
        None => manager.discover_and_load().unwrap_or_else(|e| {
            debug!(error = %e, "Config discovery failed");
            FileConfig::default()
        }),
    };

    let mut config = PriceConfig::from_sources(&file_config, &env_config)?;

    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration_string) {
        config = config.with_request_timeout(timeout);
    }
    if let Some(currency) = &args.currency {
        config = config.with_target_currency(currency.as_str());
    }

    debug!(
        concurrency = config.concurrency,
        timeout = ?config.request_timeout,
        currency = %config.target_currency,
        "Resolved configuration"
    );

    Ok(config)
}

/// Decide between a registrar comparison and a TLD sweep.
fn select_operation(args: &Args, config: &PriceConfig) -> Result<Operation, DomainPriceError> {
    let name = args
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DomainPriceError::invalid_domain("", "Name cannot be empty"))?;

    let wants_sweep =
        args.sweep || args.tlds.is_some() || args.preset.is_some() || !name.contains('.');

    if !wants_sweep {
        return Ok(Operation::Aggregate {
            domain: name.to_string(),
        });
    }

    let tlds = match (&args.tlds, &args.preset) {
        (Some(tlds), _) => tlds.clone(),
        (None, Some(preset)) => config.resolve_preset(preset)?,
        (None, None) => config.default_tlds.clone(),
    };

    Ok(Operation::Sweep {
        base_name: name.to_string(),
        tlds,
    })
}

/// Run one operation through the task runner and render it. Returns the
/// process exit status.
async fn run(args: &Args, config: &PriceConfig, operation: Operation) -> i32 {
    let sweeper = match TldSweeper::from_config(config) {
        Ok(sweeper) => sweeper,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    let (runner, mut events) = TaskRunner::new(sweeper);
    let label = match &operation {
        Operation::Aggregate { domain } => format!("Checking {}...", domain),
        Operation::Sweep { base_name, tlds } => {
            format!("Comparing {} TLDs for {}...", tlds.len(), base_name)
        }
    };

    let task = match runner.start(operation) {
        Ok(task) => task,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    debug!(task = %task, "Operation started");

    let spinner = (!args.json && Term::stderr().is_term()).then(|| ui::Spinner::start(label));

    let mut completion = None;
    while let Some(event) = events.recv().await {
        match event {
            TaskEvent::Progress { event, .. } => {
                if let Some(spinner) = &spinner {
                    spinner.set_message(ui::progress_message(&event));
                }
            }
            TaskEvent::Completed { task: done, outcome, .. } if done == task => {
                completion = Some(outcome);
                break;
            }
            TaskEvent::Completed { .. } => {}
        }
    }

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    match completion {
        Some(Ok(output)) => render(&output, args.json),
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            EXIT_USAGE
        }
        None => {
            eprintln!("Error: operation ended without a result");
            EXIT_USAGE
        }
    }
}

fn render(output: &TaskOutput, json: bool) -> i32 {
    if json {
        match serde_json::to_string_pretty(output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to serialize result: {}", e);
                return EXIT_USAGE;
            }
        }
    } else {
        match output {
            TaskOutput::Aggregate(result) => ui::print_aggregate(result),
            TaskOutput::Sweep(result) => ui::print_sweep(result),
        }
    }

    exit_status(output)
}

fn exit_status(output: &TaskOutput) -> i32 {
    let found = match output {
        TaskOutput::Aggregate(result) => result.best_quote.is_some(),
        TaskOutput::Sweep(result) => result.cheapest_quote.is_some(),
    };
    if found {
        EXIT_FOUND
    } else {
        EXIT_NOT_FOUND
    }
}

/// Print all available TLD presets with their TLDs, then exit.
fn print_presets(config: &PriceConfig) {
    use console::Style;

    let heading = Style::new().yellow().bold();
    let name_style = Style::new().green().bold();
    let count_style = Style::new().cyan();

    println!();
    println!("{}", heading.apply_to("Available TLD Presets:"));
    println!();

    let mut names: Vec<String> = get_available_presets()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut custom: Vec<String> = config.custom_presets.keys().cloned().collect();
    custom.sort();
    for name in custom {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }

    for preset_name in &names {
        if let Some(tlds) = get_preset_tlds_with_custom(preset_name, &config.custom_presets) {
            println!(
                "  {} {}  {}",
                name_style.apply_to(format!("{:<12}", preset_name)),
                count_style.apply_to(format!("({})", tlds.len())),
                tlds.join(", "),
            );
        }
    }

    println!();
    println!("Use: domain-price <name> --preset <preset>");
}
