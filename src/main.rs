use std::path::{Path, PathBuf};
use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use ionfront::config::Config;
use ionfront::error::Error;
use ionfront::restart::Checkpoint;
use ionfront::simulation::Simulation;




#[derive(Debug, Parser)]
#[clap(version, about = "MHD with non-equilibrium ionization chemistry")]
struct Opts {
    /// Run configuration (TOML)
    config: PathBuf,

    /// Resume from a checkpoint written by an earlier run
    #[clap(short, long)]
    restart: Option<PathBuf>,

    /// Size of the worker pool; overrides the configuration
    #[clap(short = 't', long)]
    num_threads: Option<usize>,

    /// Log level: error, warn, info, debug or trace
    #[clap(short, long, default_value = "info")]
    log_level: String,
}




fn main() {
    let opts = Opts::parse();

    let level = opts.log_level.parse().unwrap_or(LevelFilter::Info);

    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("{}", e);
    }
    if let Err(e) = run(&opts) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opts: &Opts) -> Result<(), Error> {
    let config = Config::from_path(&opts.config)?;
    let num_threads = opts.num_threads.or(config.run.num_threads).unwrap_or(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;

    info!("{} worker threads", pool.current_num_threads());
    pool.install(|| drive(&config, opts.restart.as_deref()))
}

fn drive(config: &Config, restart: Option<&Path>) -> Result<(), Error> {
    let mut sim = Simulation::from_config(config)?;

    if let Some(path) = restart {
        sim.restore(&Checkpoint::read(path)?)?;
    }
    log_history(&sim);

    let settings = &config.run;

    sim.run(settings.end_time, settings.max_cycles, |sim, report| {
        if let Some(chemistry) = &report.chemistry {
            if !chemistry.complete {
                info!("chemistry bounds the next step at {:.3e}", chemistry.time_done);
            }
        }
        match settings.checkpoint_interval {
            Some(interval) if report.cycle % interval == 0 => sim.checkpoint().write(&settings.checkpoint_file),
            _ => Ok(()),
        }
    })?;

    log_history(&sim);

    if settings.checkpoint_interval.is_some() {
        sim.checkpoint().write(&settings.checkpoint_file)?;
    }
    Ok(())
}

fn log_history(sim: &Simulation) {
    for (label, value) in sim.domain().history() {
        info!("{:.<24} {:+.8e}", label, value);
    }
}
