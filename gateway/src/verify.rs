// SPDX-License-Identifier: Apache-2.0 OR MIT
//! STI-VS client.
//!
//! One verification query per token, one attempt per query. A transport
//! fault (unreachable, timeout, non-2xx, unparsable body) surfaces as
//! `Err`; the handler maps it to the same client rejection as a failed
//! verdict.

use anyhow::{Context, Result};
use shaken_common::api::{VerdictEnvelope, VerificationEnvelope};
use std::time::Duration;
use tracing::debug;

/// Outcome of one STI-VS round trip that produced a well-formed answer.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

#[derive(Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl OracleClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build STI-VS http client")?;
        Ok(Self { http, url, timeout })
    }

    /// Submit one verification query. The timeout is per call; there is no
    /// retry.
    pub async fn check(&self, query: &VerificationEnvelope) -> Result<Verdict> {
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(query)
            .send()
            .await
            .context("STI-VS request failed")?
            .error_for_status()
            .context("STI-VS returned error status")?;

        let verdict: VerdictEnvelope = response
            .json()
            .await
            .context("STI-VS response was not valid JSON")?;

        if verdict.passed() {
            debug!("STI-VS verdict: passed");
            Ok(Verdict::Passed)
        } else {
            debug!(?verdict, "STI-VS verdict: failed");
            Ok(Verdict::Failed)
        }
    }
}
