use std::process::ExitCode;

use clap::Parser;
use port_bridge::runtime::TOKIO;
use port_bridge::{HostConfig, bootstrap};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HostConfig::parse();

    let page = match bootstrap(&config) {
        Ok(page) => page,
        Err(e) => {
            log::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Page running against {}, press Ctrl-C to stop",
        config.server_url
    );

    if let Err(e) = TOKIO.block_on(tokio::signal::ctrl_c()) {
        log::error!("Failed to wait for Ctrl-C: {}", e);
    }

    page.shutdown();
    ExitCode::SUCCESS
}
