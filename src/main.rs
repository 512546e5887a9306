use log::info;
use snafu::ErrorCompat;

use clap::Parser;

mod args;
mod relay;

use crate::args::Args;
use crate::relay::chrome::ChromeLauncher;
use crate::relay::config_reader::read_config;
use crate::relay::feed::SheetsFeed;
use crate::relay::RelayError;

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let config = match read_config(&args.config) {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    info!("config: {:?}", config);

    let feed = SheetsFeed::new(config.feed_url.clone(), config.credentials_path.clone());
    let sessions = ChromeLauncher::new(config.browser_binary_path.clone());

    match relay::run_pipeline(&config, &feed, &sessions) {
        Ok(summary) => info!("run complete: {:?}", summary),
        Err(e) => fail(e),
    }
}

fn fail(e: RelayError) -> ! {
    eprintln!("An error occured {}", e);
    if let Some(bt) = ErrorCompat::backtrace(&e) {
        eprintln!("trace: {}", bt);
    }
    std::process::exit(1);
}
