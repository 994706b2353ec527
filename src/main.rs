// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

use std::error::Error;
use std::sync::Arc;

use rsa::RsaPublicKey;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_agent::agent::api::DecryptionPublicKey;
use atelier_agent::agent::{Agent, AgentConfig};
use atelier_agent::art::OpenAiImageGenerator;
use atelier_agent::blockchain::{signer_from_seed, ChainClient, RpcChainClient, Wallet};
use atelier_agent::clock::SystemClock;
use atelier_agent::config::SetupConfig;
use atelier_agent::indexer::collections::CollectionRegistry;
use atelier_agent::indexer::scheduler::DEFAULT_AUCTION_POLL_INTERVAL;
use atelier_agent::indexer::DEFAULT_EVENT_POLL_INTERVAL;
use atelier_agent::pinning::{NftPublisher, PinataPinner};
use atelier_agent::prompt::PromptResolver;
use atelier_agent::setup;
use atelier_agent::tee::{DstackClient, TeeClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tracing::info!("atelier agent starting");

    let config = SetupConfig::from_env()?;
    let tee: Arc<dyn TeeClient> = Arc::new(DstackClient::new(&config.tappd_endpoint));

    // The sealed record is authoritative over the environment after first
    // boot; the enclave endpoint and blob path are the only env-only values.
    let record = setup::load_or_generate(&config, tee.as_ref()).await?;

    let signer = signer_from_seed(record.private_key_seed.as_slice())?;
    let chain = Arc::new(RpcChainClient::connect(&record.ethereum_rpc_url, signer)?);
    let chain_id = chain.chain_id().await?;
    let wallet = Arc::new(Wallet::from_seed(
        record.private_key_seed.as_slice(),
        chain_id,
    )?);

    let rsa_key = record.rsa_private_key()?;
    let decryption_pubkey = DecryptionPublicKey::from_rsa(&RsaPublicKey::from(&rsa_key));

    let agent = Agent::new(AgentConfig {
        resolver: Arc::new(PromptResolver::new(chain.clone(), rsa_key)),
        generator: Arc::new(OpenAiImageGenerator::new(
            &record.openai_api_key,
            &record.openai_model,
        )),
        publisher: Arc::new(NftPublisher::new(Arc::new(PinataPinner::new(
            &record.pinata_jwt,
        )))),
        registry: Arc::new(CollectionRegistry::new()),
        clock: Arc::new(SystemClock),
        factory_address: record.factory_address,
        api_bind_addr: record.api_bind_addr.clone(),
        event_poll_interval: DEFAULT_EVENT_POLL_INTERVAL,
        auction_poll_interval: DEFAULT_AUCTION_POLL_INTERVAL,
        chain,
        wallet,
        tee,
        decryption_pubkey,
    });

    tracing::info!(
        address = %agent.wallet_address(),
        factory = %record.factory_address,
        chain_id,
        "agent initialized"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    agent.run(shutdown).await;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
