use clap::Parser;

/// This program polls a spreadsheet-backed registration form and relays the
/// validated respondents into an external ballot form.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON configuration file describing the response feed, the
    /// target ballot form and the locations of the persisted state files.
    #[clap(short, long, value_parser)]
    pub config: String,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
