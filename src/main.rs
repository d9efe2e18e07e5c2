use clap::Parser;
use log::LevelFilter;
use pairload::{Args, StopReason, WorkloadConfig};
use std::{
    env,
    process::{self, ExitCode},
};
use tokio::{signal, sync::oneshot};

#[tokio::main]
async fn main() -> ExitCode {
    let mut logger = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    let config = WorkloadConfig::from(Args::parse());
    let (sender, receiver) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("Cannot listen for ctrl-c, the run can only stop by itself: {}", e);
            // Keep the sender alive so the receiver never resolves
            std::future::pending::<()>().await;
        }
        let _ = sender.send(());
        if signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted again, exiting without waiting for the database");
            process::exit(130);
        }
    });
    let shutdown = async move {
        if receiver.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    match config.run(shutdown).await {
        Ok(report) => match report.stop {
            StopReason::Failed(..) => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        },
        Err(e) => {
            log::error!("{:#}", anyhow::Error::from(e));
            ExitCode::FAILURE
        }
    }
}
