// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Network

//! # Runtime Configuration
//!
//! Environment variable names and the validated bootstrap configuration.
//! Configuration is read once at startup; after first boot the sealed setup
//! record on disk is authoritative for everything except the enclave endpoint
//! and the sealed-file path themselves.
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `DSTACK_TAPPD_ENDPOINT` | tappd key-derivation/attestation endpoint |
//! | `ETHEREUM_RPC_URL` | HTTP endpoint of the chain node |
//! | `FACTORY_ADDRESS` | 20-byte hex address of the collection factory |
//! | `SEALED_SETUP_FILE` | Filesystem path for the sealed setup blob |
//! | `OPENAI_API_KEY` | Credential for the image generation service |
//! | `OPENAI_IMAGE_MODEL` | Model identifier passed to the image service |
//! | `PINATA_JWT` | Credential for the IPFS pinning service |
//! | `API_BIND_ADDR` | `host:port` for the attestation API (empty = disabled) |
//! | `DEBUG_PLAIN_SETUP` | `true` = bypass sealing (debug builds only) |
//! | `DEBUG_SHOW_SETUP` | `true` = log the setup record (debug builds only) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) |
//! | `RUST_LOG` | Log level filter |

use std::env;
use std::path::PathBuf;

use alloy::primitives::Address;

pub const ENV_DSTACK_TAPPD_ENDPOINT: &str = "DSTACK_TAPPD_ENDPOINT";
pub const ENV_ETHEREUM_RPC_URL: &str = "ETHEREUM_RPC_URL";
pub const ENV_FACTORY_ADDRESS: &str = "FACTORY_ADDRESS";
pub const ENV_SEALED_SETUP_FILE: &str = "SEALED_SETUP_FILE";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_IMAGE_MODEL: &str = "OPENAI_IMAGE_MODEL";
pub const ENV_PINATA_JWT: &str = "PINATA_JWT";
pub const ENV_API_BIND_ADDR: &str = "API_BIND_ADDR";
pub const ENV_DEBUG_PLAIN_SETUP: &str = "DEBUG_PLAIN_SETUP";
pub const ENV_DEBUG_SHOW_SETUP: &str = "DEBUG_SHOW_SETUP";

/// Errors raised while loading the bootstrap configuration. All of these are
/// fatal: the process exits non-zero before any component starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Validated bootstrap configuration read from the environment.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub tappd_endpoint: String,
    pub ethereum_rpc_url: String,
    pub factory_address: Address,
    pub sealed_setup_file: PathBuf,
    pub openai_api_key: String,
    pub openai_model: String,
    pub pinata_jwt: String,
    /// Bind address for the attestation API. Empty disables the server.
    pub api_bind_addr: String,
}

impl SetupConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::Missing(name)),
            }
        };

        let factory_raw = required(ENV_FACTORY_ADDRESS)?;
        let factory_address = factory_raw
            .parse::<Address>()
            .map_err(|e| ConfigError::Invalid(ENV_FACTORY_ADDRESS, e.to_string()))?;

        Ok(Self {
            tappd_endpoint: required(ENV_DSTACK_TAPPD_ENDPOINT)?,
            ethereum_rpc_url: required(ENV_ETHEREUM_RPC_URL)?,
            factory_address,
            sealed_setup_file: PathBuf::from(required(ENV_SEALED_SETUP_FILE)?),
            openai_api_key: required(ENV_OPENAI_API_KEY)?,
            openai_model: required(ENV_OPENAI_IMAGE_MODEL)?,
            pinata_jwt: required(ENV_PINATA_JWT)?,
            api_bind_addr: lookup(ENV_API_BIND_ADDR).unwrap_or_default(),
        })
    }
}

/// Whether the sealed setup file is written without encryption.
///
/// Compiled out of release builds; the plain path must be unreachable in any
/// production artefact.
pub fn debug_plain_setup() -> bool {
    cfg!(debug_assertions) && env_flag(ENV_DEBUG_PLAIN_SETUP)
}

/// Whether the decoded setup record is logged after load.
pub fn debug_show_setup() -> bool {
    cfg!(debug_assertions) && env_flag(ENV_DEBUG_SHOW_SETUP)
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "true" || v == "1").unwrap_or(false)
}
