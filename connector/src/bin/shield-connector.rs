use alloy_provider::ProviderBuilder;
use clap::Parser;
use shield_connector::chain::balances::ChainBalanceSource;
use shield_connector::core::{
    auth::{AuthorizationManager, InMemoryAuthorizationStore},
    config::Config,
    coordinator::{CoordinatorOptions, RevealCoordinator},
    session::{SessionContext, SessionWallet},
};
use shield_connector::relayer::RelayerClient;
use shield_protocol::ProtocolRegistry;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "shield-connector",
    about = "Tracks confidential balances and coordinates user-triggered reveals"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting shield connector...");

    let args = Args::parse();
    let config = Config::from_file(&args.config)?;
    let registry = ProtocolRegistry::for_chain(config.chain_id)
        .ok_or_else(|| anyhow::anyhow!("No deployment known for chain id {}", config.chain_id))?;

    let provider = Arc::new(ProviderBuilder::new().on_http(config.rpc_url.parse()?));

    let wallet = SessionWallet::from_mnemonic(&config.mnemonic, Some(config.chain_id))?;
    info!("Session wallet {} ready", wallet.address());
    let session = SessionContext::new(config.chain_id, wallet);

    let source = Arc::new(ChainBalanceSource::new(provider.clone()));
    let client = Arc::new(RelayerClient::new(config.relayer_url.clone()));
    let auth = AuthorizationManager::new(
        Arc::new(InMemoryAuthorizationStore::default()),
        config.get_decryption_verifier_address()?,
        config.authorization_validity_days(),
    );

    let options = CoordinatorOptions {
        poll_interval: Duration::from_secs(config.poll_interval_secs()),
        channel_size: config
            .channel_size
            .unwrap_or_else(|| CoordinatorOptions::default().channel_size),
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (coordinator, handle, mut snapshot_rx) = RevealCoordinator::new(
        registry.reveal_targets(),
        session,
        source,
        client,
        auth,
        options,
        shutdown_rx,
    );

    let coordinator_task = tokio::spawn(coordinator.run());

    // Log portfolio changes. Revealing stays a user-triggered operation on
    // the coordinator handle, never automatic.
    let _handle = handle;
    tokio::spawn(async move {
        while snapshot_rx.changed().await.is_ok() {
            let snapshot = snapshot_rx.borrow().clone();
            for slot in &snapshot.slots {
                info!("{}: {:?} {}", slot.label, slot.state, slot.display);
            }
        }
    });

    tokio::signal::ctrl_c().await?;

    info!("Shutting down shield connector...");
    let _ = shutdown_tx.send(());
    coordinator_task.await??;

    info!("Shield connector stopped successfully");
    Ok(())
}
