use clap::Parser;
use epanet_output::config::LoadConfig;
use epanet_output::options::OptionKind;
use epanet_output::{Coordinator, ExportKey, PluginRegistry, Progress, SummaryPlugin};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eoft", about = "Read, print and export EPANET 2.00.12 binary output files")]
struct Cli {
    /// EPANET binary output file
    #[arg(required_unless_present = "list_options")]
    file: Option<PathBuf>,

    /// Print all sections (default when nothing else is requested)
    #[arg(short, long)]
    all: bool,
    /// Print nothing but errors
    #[arg(short, long)]
    silent: bool,
    /// Print the prolog section
    #[arg(short, long)]
    prolog: bool,
    /// Write prolog node info as CSV
    #[arg(short = 'n', long, value_name = "FILE")]
    prolog_node_csv: Option<PathBuf>,
    /// Write prolog link info as CSV
    #[arg(short = 'l', long, value_name = "FILE")]
    prolog_link_csv: Option<PathBuf>,
    /// Print the energy use section
    #[arg(short, long)]
    energy_use: bool,
    /// Write energy usage as CSV
    #[arg(short = 'E', long, value_name = "FILE")]
    energy_use_csv: Option<PathBuf>,
    /// Print the dynamic results section
    #[arg(short, long)]
    dynamic_results: bool,
    /// Write dynamic node results as CSV
    #[arg(short = 'N', long, value_name = "FILE")]
    dynamic_node_csv: Option<PathBuf>,
    /// Write dynamic link results as CSV
    #[arg(short = 'L', long, value_name = "FILE")]
    dynamic_link_csv: Option<PathBuf>,
    /// Print the epilog section
    #[arg(short = 'c', long, visible_alias = "coda")]
    epilog: bool,
    /// Chatty output and debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Plugin option, NAME or NAME=VALUE (repeatable)
    #[arg(short = 'O', long = "plugin-option", value_name = "NAME[=VALUE]")]
    plugin_options: Vec<String>,
    /// List the options declared by plugins and exit
    #[arg(long)]
    list_options: bool,
    /// Load settings from a JSON file; command-line flags are added on top
    #[arg(long, value_name = "FILE.json")]
    config: Option<PathBuf>,
    /// Dump the decoded model as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = PluginRegistry::new().with(Box::new(SummaryPlugin::new()));
    let mut coordinator = Coordinator::new(registry);

    if cli.list_options {
        for spec in coordinator.options().specs() {
            let usage = match (spec.kind, &spec.metavar) {
                (OptionKind::Str, Some(m)) => format!("{}={}", spec.name, m),
                (OptionKind::Bool, _)      => format!("{}[=true|false]", spec.name),
                _                          => spec.name.clone(),
            };
            println!("  {:<36} {}  [{}]", usage, spec.help, spec.owner);
        }
        return Ok(());
    }
    let Some(file) = cli.file.clone() else {
        return Err("no input file given".into());
    };

    let config = build_config(&cli, &coordinator)?;
    let silent = config.display.silent;

    let mut progress = if cli.verbose {
        let mut last = None;
        Progress::new(Box::new(move |value: u32, message: &str| {
            if last != Some(value) {
                tracing::debug!(progress = value, "{message}");
                last = Some(value);
            }
        }))
    } else {
        Progress::silent()
    };

    let started = chrono::Local::now();
    let model = coordinator.load(&file, &config, &mut progress)?;

    if let Some(path) = &cli.json {
        let out = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(out, model)?;
        if !silent {
            println!("Wrote model JSON: {}", path.display());
        }
    }

    if !silent {
        let elapsed = chrono::Local::now() - started;
        println!("Time taken {}.{:03} seconds", elapsed.num_seconds(), elapsed.num_milliseconds() % 1000);
    }
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli, coordinator: &Coordinator) -> Result<LoadConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => LoadConfig::from_json_file(path)?,
        None       => LoadConfig::default(),
    };

    let d = &mut config.display;
    d.all             |= cli.all;
    d.silent          |= cli.silent;
    d.prolog          |= cli.prolog;
    d.energy_use      |= cli.energy_use;
    d.dynamic_results |= cli.dynamic_results;
    d.epilog          |= cli.epilog;
    d.verbose         |= cli.verbose;

    let csvs = [
        (ExportKey::PrologNodeCsv,  &cli.prolog_node_csv),
        (ExportKey::PrologLinkCsv,  &cli.prolog_link_csv),
        (ExportKey::EnergyUseCsv,   &cli.energy_use_csv),
        (ExportKey::DynamicNodeCsv, &cli.dynamic_node_csv),
        (ExportKey::DynamicLinkCsv, &cli.dynamic_link_csv),
    ];
    for (key, path) in csvs {
        if let Some(path) = path {
            config.export.set(key, path.clone());
        }
    }

    let parsed = coordinator.options().parse_all(cli.plugin_options.iter().map(String::as_str))?;
    for (name, value) in parsed.iter() {
        config.plugin_options.set(name, value.clone());
    }
    Ok(config)
}
