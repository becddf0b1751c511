use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use repolens::config::MapConfig;
use repolens::map::RepoMapper;

/// Render a ranked, budgeted map of a repository.
#[derive(Parser, Debug)]
#[command(name = "repolens", version, about)]
struct Cli {
    /// Repository root to map.
    root: PathBuf,

    /// Free-form task description used to bias the ranking.
    #[arg(long)]
    task: Option<String>,

    /// Paths already visible to the agent (repeatable).
    #[arg(long = "visible")]
    visible: Vec<String>,

    /// Size budget in cost units (roughly tokens).
    #[arg(long, default_value_t = 2048)]
    budget: usize,

    /// Log pipeline detail to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("repolens: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = MapConfig::load(&cli.root);
    if let Some(source) = &config.source {
        log::debug!("loaded config from {}", source.display());
    }
    let mapper = RepoMapper::new(&cli.root, config);

    let files = mapper.snapshot()?;
    log::debug!("{} files in scope", files.len());

    match mapper.build_map(&files, cli.task.as_deref(), &cli.visible, cli.budget)? {
        Some(map) => print!("{map}"),
        None => println!("(no map fits the requested budget)"),
    }
    Ok(())
}
