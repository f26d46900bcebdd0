//! Command line poller that announces newly opened court bookings.

mod app;
mod args;
mod logging;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use courtwatch_core::driver::PollDriver;

use crate::app::Secrets;
use crate::args::Args;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the variables may come from the environment.
    let _env_file = dotenvy::dotenv().ok();

    let args = Args::parse();
    logging::init(args.log_format);

    let settings = args.settings()?;
    let client = Client::builder()
        .user_agent("courtwatch/0.1")
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let ports = app::build_ports(&args, &Secrets::from_env(), client)?;
    let driver = PollDriver::new(settings, ports);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current cycle");
                on_interrupt.cancel();
            }
            Err(err) => error!(error = %err, "Cannot listen for interrupts"),
        }
    });

    driver.run(cancel).await;
    Ok(())
}
