use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use l2switch_cli::{until_shutdown, Cli};
use l2switch_core::{Error, LinkDriver, Result, SwitchConfig};
use l2switch_engine::{BpduScheduler, Switch};
use l2switch_link::DatalinkDriver;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "l2switch failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    let switch_config = SwitchConfig::load(&config_path)?;

    let names: Vec<String> = if cli.interfaces.is_empty() {
        switch_config.ports.iter().map(|p| p.name.clone()).collect()
    } else {
        cli.interfaces.clone()
    };
    if names.len() != switch_config.ports.len() {
        return Err(Error::config(
            0,
            format!(
                "{} configures {} ports but {} interfaces were given",
                config_path.display(),
                switch_config.ports.len(),
                names.len()
            ),
        ));
    }

    let link = Arc::new(DatalinkDriver::open(&names)?);
    let engine_config = cli.engine_config();
    let hello_interval = engine_config.hello_interval;
    let mut switch = Switch::from_config(&switch_config, link.mac_address(), engine_config);

    info!(
        switch_id = cli.switch_id,
        priority = switch_config.priority,
        mac = %link.mac_address(),
        interfaces = ?names,
        "l2switch starting"
    );

    let bridge = Arc::clone(switch.bridge());
    let mut scheduler = BpduScheduler::new(bridge, link.clone(), hello_interval)
        .with_stats(switch.stats().clone())
        .spawn();

    let stop = Arc::new(AtomicBool::new(false));
    let rx_link = Arc::clone(&link);
    let rx_stop = Arc::clone(&stop);
    let mut receiver = tokio::task::spawn_blocking(move || {
        switch
            .run(rx_link.as_ref(), &rx_stop)
            .map(|()| switch.stats().snapshot())
    });

    let finished = until_shutdown(tokio::signal::ctrl_c(), &mut receiver).await;

    stop.store(true, Ordering::Relaxed);
    let passes = scheduler.stop_and_wait().await?;

    let joined = match finished {
        Some(joined) => joined,
        None => receiver.await,
    };
    link.shutdown();

    let stats = joined.map_err(|e| Error::Task(format!("receive loop: {}", e)))??;
    info!(hello_passes = passes, %stats, "l2switch stopped");
    Ok(())
}
