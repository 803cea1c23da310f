use mall_dashboard::app::{self, AppContext};
use mall_dashboard::config::Config;
use mall_dashboard::loader::Dataset;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .init();

    // The server never starts with an invalid dataset.
    let dataset = match Dataset::from_path(&config.data_path) {
        Ok(dataset) => dataset,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app::run(&config, AppContext::new(dataset)).await {
        log::error!("server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
