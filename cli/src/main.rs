mod scrape;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape every posting for a keyword into a CSV file
    Scrape(scrape::ScrapeArgs),
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Cli::parse();
    let result = match args.command {
        Commands::Scrape(args) => scrape::scrape(args).await,
    };
    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
