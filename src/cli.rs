use clap::Parser;

/// Runs the reqres.in contract scenarios against a live API
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suite configuration file
    #[arg(short, long, default_value = "contract_quest.toml")]
    pub path: String,

    /// Overrides `setup.base_url` from the configuration file
    #[arg(long)]
    pub base_url: Option<String>,

    /// Only run the named scenario; can be repeated
    #[arg(short, long = "scenario")]
    pub scenarios: Vec<String>,

    /// Print the scenario catalogue and exit
    #[arg(long)]
    pub list: bool,
}
