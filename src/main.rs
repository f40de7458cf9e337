//! Feed digest binary entrypoint.
//! Loads config, wires the pipeline and runs it once or on a schedule.

use std::process::ExitCode;

use feed_digest::pipeline::RunOutcome;
use feed_digest::{build_pipeline, logging, scheduler, AppConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    logging::init();

    let cfg = match AppConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "configuration rejected");
            return ExitCode::from(2);
        }
    };

    let pipeline = match build_pipeline(&cfg) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "could not build pipeline");
            return ExitCode::from(2);
        }
    };

    if let Some(interval) = cfg.schedule.interval() {
        tracing::info!(every_secs = interval.as_secs(), "scheduled mode");
        return match scheduler::run_every(&pipeline, interval, None).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(failure) => {
                eprintln!("{failure}");
                ExitCode::FAILURE
            }
        };
    }

    match pipeline.run_once().await {
        Ok(report) => {
            report.log();
            match report.outcome {
                RunOutcome::NothingNew => println!("No relevant articles found."),
                RunOutcome::Sent { articles, .. } => println!("Digest sent with {articles} article(s)."),
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}
