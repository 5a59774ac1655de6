// SPDX-License-Identifier: Apache-2.0 OR MIT
//! PASSporT (attestation token) parsing.
//!
//! A token arrives as one line of compact `header.payload.signature` text.
//! This gateway only decodes the header (for the certificate URL) and the
//! payload (for the issuance time); the signature segment stays opaque and
//! travels to the STI-VS inside the identity string.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassportError {
    #[error("token has no payload segment")]
    MissingSegment,

    #[error("segment is not valid base64url: {0}")]
    Base64(base64ct::Error),

    #[error("decoded segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decoded segment is not UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Decoded protected header. Only `x5u` is consumed; everything else
/// (alg, ppt, typ, ...) is the STI-VS's business.
#[derive(Debug, Deserialize)]
pub struct Header {
    /// Certificate locator, interpolated into the identity string
    pub x5u: String,
}

/// Decoded claims. Only the issuance time matters for freshness.
#[derive(Debug, Deserialize)]
pub struct Claims {
    /// Issuance time, Unix seconds
    pub iat: i64,
}

/// One attestation token, split but not yet decoded.
#[derive(Debug, Clone, Copy)]
pub struct Passport<'a> {
    raw: &'a str,
    header_b64: &'a str,
    payload_b64: &'a str,
}

impl<'a> Passport<'a> {
    /// Split a raw token line into its segments.
    ///
    /// The signature segment is not required here: a two-part token splits
    /// fine and fails later at the STI-VS, exactly like any other invalid
    /// signature would.
    pub fn parse(raw: &'a str) -> Result<Self, PassportError> {
        let mut parts = raw.split('.');
        let header_b64 = parts.next().unwrap_or("");
        let payload_b64 = parts.next().ok_or(PassportError::MissingSegment)?;
        Ok(Self {
            raw,
            header_b64,
            payload_b64,
        })
    }

    /// The raw token text, byte-identical to the input line.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Decode and deserialize the protected header.
    pub fn header(&self) -> Result<Header, PassportError> {
        decode_segment(self.header_b64)
    }

    /// Decode and deserialize the claims.
    pub fn claims(&self) -> Result<Claims, PassportError> {
        decode_segment(self.payload_b64)
    }

    /// Identity string submitted to the STI-VS:
    /// `<raw token>;info=<<certificate url>>`
    pub fn identity(&self, x5u: &str) -> String {
        format!("{};info=<{}>", self.raw, x5u)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(b64: &str) -> Result<T, PassportError> {
    let bytes = Base64UrlUnpadded::decode_vec(b64).map_err(PassportError::Base64)?;
    let text = std::str::from_utf8(&bytes)?;
    Ok(serde_json::from_str(text)?)
}
