use anyhow::Result;
use readme_stats::cli::{init_tracing, Cli};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.execute()
}
