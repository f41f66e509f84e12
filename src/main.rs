use std::sync::Arc;

use config::Config;
use notify::{Notifier, TelegramApi};
use watch::ContainerLogWatcher;

mod config;
mod detect;
mod docker;
mod identity;
mod notify;
mod watch;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let docker = match docker::connect(&config.docker_socket_path) {
        Ok(docker) => docker,
        Err(e) => {
            log::error!(
                "Failed to connect to Docker at {}: {}",
                config.docker_socket_path,
                e
            );
            std::process::exit(1);
        }
    };

    let notifier_handle = match config.telegram {
        Some(telegram) => {
            let api = TelegramApi::new(telegram.bot_token, telegram.chat_id);
            let (handle, notifier) = Notifier::new(api);
            tokio::spawn(notifier.run());
            Some(handle)
        }
        None => {
            log::info!("Telegram notifications are disabled");
            None
        }
    };

    let watcher = match ContainerLogWatcher::create(docker, notifier_handle.clone()).await {
        Ok(watcher) => Arc::new(watcher),
        Err(e) => {
            log::error!("Failed to initialize container log watcher: {e}");
            std::process::exit(1);
        }
    };

    if let Some(handle) = &notifier_handle {
        handle.announce_deployed();
    }

    let signal_watcher = Arc::clone(&watcher);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_watcher.cancel().await,
            Err(e) => log::error!("Failed to listen for shutdown signal: {e}"),
        }
    });

    watcher.watch().await;
    log::info!("Container log watcher stopped");
}
