// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! Attestation API.
//!
//! Three public endpoints relying parties use before trusting the agent:
//!
//! | Path | Response |
//! |------|----------|
//! | `GET /address` | plain-text hex of the wallet address |
//! | `GET /pubkey` | JSON of the prompt-decryption public key (modulus, exponent) |
//! | `GET /quote` | JSON string: TDX quote over `address ‖ factory` |
//!
//! The server is optional (no bind address configured means no server) and a
//! bind failure is logged but never fatal: the agent keeps settling auctions
//! without it.

use std::sync::Arc;

use alloy::primitives::Address;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::tee::{ReportData, TeeClient};

/// The prompt-decryption public key as served by `/pubkey`. Submitters who
/// want a confidential system prompt encrypt under this key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DecryptionPublicKey {
    /// Big-endian modulus, hex.
    pub modulus: String,
    pub exponent: u64,
}

impl DecryptionPublicKey {
    pub fn from_rsa(key: &RsaPublicKey) -> Self {
        let exponent = key
            .e()
            .to_bytes_be()
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        Self {
            modulus: alloy::hex::encode(key.n().to_bytes_be()),
            exponent,
        }
    }
}

/// Shared state for the attestation handlers.
#[derive(Clone)]
pub struct ApiState {
    pub wallet_address: Address,
    pub factory_address: Address,
    pub decryption_pubkey: DecryptionPublicKey,
    pub tee: Arc<dyn TeeClient>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/address", get(address))
        .route("/pubkey", get(pubkey))
        .route("/quote", get(quote))
        .layer(TraceLayer::new_for_http())
        // Public attestation surface; anyone may verify.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn address(State(state): State<ApiState>) -> String {
    state.wallet_address.to_string()
}

async fn pubkey(State(state): State<ApiState>) -> Json<DecryptionPublicKey> {
    Json(state.decryption_pubkey.clone())
}

async fn quote(State(state): State<ApiState>) -> Response {
    let report_data = ReportData::new(state.wallet_address, state.factory_address).to_bytes();

    match state.tee.tdx_quote(&report_data).await {
        Ok(quote) => Json(quote).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to produce attestation quote");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind and serve until the root token is cancelled. Bind failures log and
/// return; the rest of the agent is unaffected.
pub async fn serve(bind_addr: String, state: ApiState, shutdown: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "failed to bind attestation API, continuing without it");
            return;
        }
    };

    tracing::info!(address = %bind_addr, "attestation API listening");

    let app = router(state);
    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "attestation API server error");
    }
}
