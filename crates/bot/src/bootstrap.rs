use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use huddle_core::config::{AppConfig, ConfigError, LoadOptions};
use huddle_core::runtime::BotRuntime;
use huddle_slack::{EventParser, LoggingChatApi, NoopRtmTransport, ReconnectPolicy, RtmRunner};
use huddle_store::StoreError;

use crate::handlers;

pub struct Application {
    pub config: AppConfig,
    pub runner: RtmRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("state store setup failed: {0}")]
    Store(#[from] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting bot bootstrap");
    let mode = config.connection.mode()?;

    let store = huddle_store::from_config(&config.storage).await?;
    info!(
        event_name = "system.bootstrap.store_ready",
        backend = ?config.storage.backend,
        "state store ready"
    );

    let runtime = BotRuntime::new(handlers::dispatcher(store.clone()))
        .with_store(store)
        .with_idle_timeout(Duration::from_secs(config.engine.idle_timeout_secs));

    let parser = match &config.connection.bot_user_id {
        Some(bot_user_id) => EventParser::new(bot_user_id.clone()),
        None => {
            warn!(
                event_name = "system.bootstrap.no_bot_user_id",
                "connection.bot_user_id is not set; mentions will not be classified or stripped"
            );
            EventParser::new("")
        }
    };
    let policy = ReconnectPolicy {
        max_retries: config.connection.max_retries,
        base_delay_ms: config.connection.base_delay_ms,
        max_delay_ms: config.connection.max_delay_ms,
    };
    let runner =
        RtmRunner::new(Arc::new(NoopRtmTransport), Arc::new(LoggingChatApi), parser, runtime)
            .with_reconnect_policy(policy);

    info!(event_name = "system.bootstrap.ready", connection_mode = ?mode, "bot wired and ready");
    Ok(Application { config, runner })
}
