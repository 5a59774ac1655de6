// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Wire types for the STI-VS verification exchange.
//!
//! The STI-VS expects a single-key envelope around the request and answers
//! with a single-key envelope around the verdict. Field names are fixed by
//! the service contract, hence the explicit renames.

use serde::{Deserialize, Serialize};

/// `verstat` value the STI-VS returns for a token that passed validation.
pub const VERSTAT_PASSED: &str = "TN-Validation-Passed";

// ============================================================================
// Outbound request
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VerificationEnvelope {
    #[serde(rename = "verificationRequest")]
    pub verification_request: VerificationRequest,
}

#[derive(Debug, Serialize)]
pub struct VerificationRequest {
    /// Originating number of the call leg under verification
    pub orig: OrigTn,

    /// Destination number(s); the STI-VS contract takes a list even though
    /// this gateway only ever submits one
    pub dest: DestTn,

    /// Server-stamped request time (Unix seconds), not the token's own iat
    pub iat: i64,

    /// `<raw token>;info=<<certificate url>>`
    pub identity: String,
}

#[derive(Debug, Serialize)]
pub struct OrigTn {
    pub tn: String,
}

#[derive(Debug, Serialize)]
pub struct DestTn {
    pub tn: Vec<String>,
}

impl VerificationEnvelope {
    /// Build the per-token query submitted to the STI-VS.
    pub fn new(orig: &str, dest: &str, iat: i64, identity: String) -> Self {
        Self {
            verification_request: VerificationRequest {
                orig: OrigTn {
                    tn: orig.to_owned(),
                },
                dest: DestTn {
                    tn: vec![dest.to_owned()],
                },
                iat,
                identity,
            },
        }
    }
}

// ============================================================================
// Inbound verdict
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VerdictEnvelope {
    /// Absent or malformed means a failed verdict, not a protocol error
    #[serde(rename = "verificationResponse", default)]
    pub verification_response: Option<VerificationResponse>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub verstat: Option<String>,
}

impl VerdictEnvelope {
    /// True iff the response carries the passing `verstat` sentinel.
    pub fn passed(&self) -> bool {
        self.verification_response
            .as_ref()
            .and_then(|r| r.verstat.as_deref())
            .map(|v| v == VERSTAT_PASSED)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_sti_vs_shape() {
        let env = VerificationEnvelope::new(
            "15559876543",
            "15551234567",
            1010,
            "a.b.c;info=<https://cert.example/x>".to_owned(),
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["verificationRequest"]["orig"]["tn"], "15559876543");
        assert_eq!(
            json["verificationRequest"]["dest"]["tn"],
            serde_json::json!(["15551234567"])
        );
        assert_eq!(json["verificationRequest"]["iat"], 1010);
        assert_eq!(
            json["verificationRequest"]["identity"],
            "a.b.c;info=<https://cert.example/x>"
        );
    }

    #[test]
    fn passing_verdict_is_recognized() {
        let v: VerdictEnvelope = serde_json::from_str(
            r#"{"verificationResponse":{"verstat":"TN-Validation-Passed"}}"#,
        )
        .unwrap();
        assert!(v.passed());
    }

    #[test]
    fn any_other_verstat_fails() {
        let v: VerdictEnvelope = serde_json::from_str(
            r#"{"verificationResponse":{"verstat":"TN-Validation-Failed"}}"#,
        )
        .unwrap();
        assert!(!v.passed());
    }

    #[test]
    fn missing_response_object_fails() {
        let v: VerdictEnvelope = serde_json::from_str(r#"{"something":"else"}"#).unwrap();
        assert!(!v.passed());

        let v: VerdictEnvelope =
            serde_json::from_str(r#"{"verificationResponse":{}}"#).unwrap();
        assert!(!v.passed());
    }
}
