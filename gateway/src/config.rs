// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Context, Result};
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_host: String,
    pub port: u16,
    /// Freshness window in seconds; positive
    pub freshness_sec: i64,
    /// STI-VS endpoint the gateway verifies tokens against
    pub sti_vs_url: String,
    /// Per-call STI-VS timeout in milliseconds; positive
    pub sti_vs_timeout_ms: u64,
    /// Redis connection URL; absent means the in-memory store
    pub redis_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port: u32 = match env::var("PORT") {
            Ok(s) => s
                .parse()
                .with_context(|| format!("Config parameter PORT must be an integer, got {:?}", s))?,
            Err(_) => 8081,
        };
        if port == 0 {
            bail!("Config parameter PORT must be greater than 0");
        }
        if port > 65535 {
            bail!("Config parameter PORT must be less than 65536");
        }

        let freshness_sec: i64 = match env::var("FRESHNESS_SEC") {
            Ok(s) => s.parse().with_context(|| {
                format!("Config parameter FRESHNESS_SEC must be an integer, got {:?}", s)
            })?,
            Err(_) => 60,
        };
        if freshness_sec <= 0 {
            bail!("Config parameter FRESHNESS_SEC must be greater than 0");
        }

        let sti_vs_url = env::var("STI_VS_URL")
            .context("Config parameter STI_VS_URL must be specified")?;
        if sti_vs_url.trim().is_empty() {
            bail!("Config parameter STI_VS_URL must not be empty");
        }

        let sti_vs_timeout_ms: u64 = match env::var("STI_VS_TIMEOUT_MS") {
            Ok(s) => s.parse().with_context(|| {
                format!("Config parameter STI_VS_TIMEOUT_MS must be an integer, got {:?}", s)
            })?,
            Err(_) => 2000,
        };
        if sti_vs_timeout_ms == 0 {
            bail!("Config parameter STI_VS_TIMEOUT_MS must be greater than 0");
        }

        Ok(Self {
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: port as u16,
            freshness_sec,
            sti_vs_url,
            sti_vs_timeout_ms,
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
        })
    }
}
