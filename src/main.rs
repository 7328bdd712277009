use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wash_trade_sentinel::config::AppCfg;
use wash_trade_sentinel::{
    ConnectorCfg, Console, ContractDescriptor, MonitorClient, MonitorOptions, RpcConnector,
    SubscribeOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logging, kept off stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cfg_path = std::env::args().nth(1).unwrap_or_else(|| "./config.yaml".to_string());
    let cfg = AppCfg::load(&cfg_path)?;
    info!("Loaded config from {}", cfg_path);

    // deps
    let connector = RpcConnector::new(ConnectorCfg::from(&cfg.chain));
    let monitor = MonitorClient::new(MonitorOptions {
        provider: Arc::new(connector),
    });

    let descriptor = ContractDescriptor::from_cfg(&cfg.sentinel)?;
    let sentinel = monitor.sentinel(&descriptor)?.with_options(SubscribeOptions {
        from_block: cfg.listener.from_block,
    });

    info!(
        "Watching '{}' at {:#x} for '{}' events",
        sentinel.contract().name,
        sentinel.contract().address,
        cfg.listener.event
    );

    let console = Console::stdout();
    let alerts = console.clone();
    let subscription = sentinel
        .on(&cfg.listener.event, move |payload| alerts.alert(&payload))
        .await
        .inspect_err(|e| error!("Failed to subscribe to '{}' events: {}", cfg.listener.event, e))?;

    console.startup_notice();

    let delivered = subscription
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    info!("Listener stopped, {} alerts delivered", delivered);

    Ok(())
}
