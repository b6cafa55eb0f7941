// src/main.rs

use jobgraph::exec::Shell;
use jobgraph::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("jobgraph error: {err}");
        std::process::exit(2);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    // Resolved once; a host without a usable shell cannot run anything.
    let shell = Shell::resolve()?;
    run(args, shell).await?;
    Ok(())
}
