// for the quick data allocation on memory
#[global_allocator]
static ALLOC: rpmalloc::RpMalloc = rpmalloc::RpMalloc;

use anyhow::{ bail, Context, Result };

use triangular_arbitrage_detector::{ app, config::Config, utils::logging };

#[derive(Debug)]
enum Command {
    Run,
    Discover,
}

fn main() -> Result<()> {
    let command = match std::env::args().nth(1).as_deref() {
        None | Some("run") => Command::Run,
        Some("discover") => Command::Discover,
        Some(other) => bail!("Unknown command {:?}, expected `run` or `discover`", other),
    };

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    let _log_guards = logging
        ::init_logging(config.log_level, config.debug, &config.log_config)
        .context("Failed to initialize logging system")?;

    match command {
        Command::Run => app::normal_mode::run_normal_mode(config)?,
        Command::Discover => app::discover_mode::run_discover_mode(config)?,
    }

    Ok(())
}
