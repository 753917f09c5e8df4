// src/main.rs

use jobstep_agent::types::JobResult;
use jobstep_agent::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(Some(JobResult::Failed)) => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("jobstep-agent error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<Option<JobResult>> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
