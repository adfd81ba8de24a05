use std::io::{self, BufWriter, Write as _};
use std::process::ExitCode;

use env_logger;
use rangeperm::config::{read_from_default_location, read_from_path, Config, ConfigError};
use rangeperm::AddressRangePermutation;

fn load() -> Result<Config, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => read_from_path(path),
        None => read_from_default_location(),
    }
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for range in config.address_ranges()? {
        log::info!("Shuffling {} (limit {})", range, config.limit);
        let addrs = AddressRangePermutation::new(range).into_iter();
        for addr in addrs.take(usize::try_from(config.limit).unwrap_or(usize::MAX)) {
            writeln!(out, "{}", addr)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let config = match load() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    log::debug!("Config = {:?}", config);
    if let Err(err) = run(&config) {
        log::error!("{}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
