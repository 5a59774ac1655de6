// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The verification-and-caching pipeline.
//!
//! One request = one batch. The stages run in strict sequence:
//! parse path and body, verify each token against the STI-VS (in line
//! order, short-circuiting on the first failure), aggregate the minimum
//! issuance time, then cache the raw batch text for whatever freshness
//! remains.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use shaken_common::api::VerificationEnvelope;
use shaken_common::passport::Passport;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::verify::Verdict;
use crate::AppState;

/// Content type the batch body must carry.
pub const PASSPORT_CONTENT_TYPE: &str = "application/passport";

/// Handler for `POST /{lrn}/{dest}/{vln}/{orig}`.
///
/// The first and third segments are 4-character routing tokens the gateway
/// ignores beyond shape-checking; the second and fourth are the destination
/// and origin numbers of the call leg.
pub async fn verify_batch(
    State(st): State<Arc<AppState>>,
    Path((lrn, dest, vln, orig)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1) Path validation. A non-matching shape is a routing miss, not a
    //    bad request.
    if !is_routing_token(&lrn) || !is_routing_token(&vln) {
        debug!(%lrn, %vln, "routing token segment mismatch");
        return StatusCode::NOT_FOUND;
    }
    if !is_telephone_number(&dest) || !is_telephone_number(&orig) {
        debug!(%dest, %orig, "telephone number segment mismatch");
        return StatusCode::NOT_FOUND;
    }

    // 2) Body validation: must be a UTF-8 passport bundle.
    if !content_type_is_passport(&headers) {
        warn!("rejecting batch: content type is not {}", PASSPORT_CONTENT_TYPE);
        return StatusCode::BAD_REQUEST;
    }
    let Ok(text) = std::str::from_utf8(&body) else {
        warn!("rejecting batch: body is not UTF-8");
        return StatusCode::BAD_REQUEST;
    };
    let batch = text.trim();
    if batch.is_empty() {
        warn!("rejecting batch: empty body");
        return StatusCode::BAD_REQUEST;
    }

    let now = time::OffsetDateTime::now_utc().unix_timestamp();

    // 3) Sequential verification with short-circuit: the first token that
    //    fails decoding or verification rejects the whole batch, and later
    //    tokens are never submitted.
    let mut min_iat = i64::MAX;

    for (idx, line) in split_tokens(batch).enumerate() {
        let passport = match Passport::parse(line) {
            Ok(p) => p,
            Err(e) => {
                warn!(token = idx, %e, "token is not a compact passport");
                return StatusCode::BAD_REQUEST;
            }
        };

        let header = match passport.header() {
            Ok(h) => h,
            Err(e) => {
                warn!(token = idx, %e, "token header decode failed");
                return StatusCode::BAD_REQUEST;
            }
        };

        let query =
            VerificationEnvelope::new(&orig, &dest, now, passport.identity(&header.x5u));

        match st.oracle.check(&query).await {
            Ok(Verdict::Passed) => {
                debug!(token = idx, "STI-VS passed token");
            }
            Ok(Verdict::Failed) => {
                warn!(token = idx, "STI-VS rejected token");
                return StatusCode::BAD_REQUEST;
            }
            // Channel faults (unreachable, timeout, bad response) map to
            // the same client rejection as a failed verdict; only the log
            // line tells the two cases apart.
            Err(e) => {
                warn!(token = idx, error = ?e, "STI-VS call failed");
                return StatusCode::BAD_REQUEST;
            }
        }

        // 4) Freshness aggregation: oldest issuance time across the batch.
        match passport.claims() {
            Ok(claims) => min_iat = min_iat.min(claims.iat),
            Err(e) => {
                warn!(token = idx, %e, "token payload decode failed");
                return StatusCode::BAD_REQUEST;
            }
        }
    }

    // 5) Cache placement. TTL is the freshness remaining for the oldest
    //    token; a batch past its window is still a success, just not
    //    cache-worthy.
    let key = format!("orig:{}:dest:{}", orig, dest);
    // Saturating: an absurd far-future iat must not wrap the arithmetic.
    let ttl = min_iat.saturating_add(st.freshness_sec).saturating_sub(now);
    if ttl > 0 {
        if let Err(e) = st
            .store
            .set_with_ttl(&key, batch, Duration::from_secs(ttl as u64))
            .await
        {
            error!(%key, error = ?e, "cache write failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        info!(%key, ttl, "verified batch cached");
    } else {
        info!(%key, ttl, "verified batch outside freshness window, not cached");
    }

    StatusCode::CREATED
}

/// One token per line; `\r\n` and bare `\n` both end a line. Interior
/// blank lines stay in the batch and fail header decoding downstream.
fn split_tokens(batch: &str) -> impl Iterator<Item = &str> {
    batch
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn is_routing_token(s: &str) -> bool {
    s.len() == 4
        && s.bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

fn is_telephone_number(s: &str) -> bool {
    (7..=15).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

fn content_type_is_passport(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .eq_ignore_ascii_case(PASSPORT_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_tokens_are_four_uppercase_alphanumerics() {
        assert!(is_routing_token("ABCD"));
        assert!(is_routing_token("A1B2"));
        assert!(is_routing_token("0000"));
        assert!(!is_routing_token("abcd"));
        assert!(!is_routing_token("ABC"));
        assert!(!is_routing_token("ABCDE"));
        assert!(!is_routing_token("AB-D"));
    }

    #[test]
    fn telephone_numbers_are_seven_to_fifteen_digits() {
        assert!(is_telephone_number("1234567"));
        assert!(is_telephone_number("123456789012345"));
        assert!(!is_telephone_number("123456"));
        assert!(!is_telephone_number("1234567890123456"));
        assert!(!is_telephone_number("12345a7"));
        assert!(!is_telephone_number("+15551234567"));
    }

    #[test]
    fn split_handles_both_line_endings() {
        let lines: Vec<&str> = split_tokens("a.b.c\r\nd.e.f\ng.h.i").collect();
        assert_eq!(lines, vec!["a.b.c", "d.e.f", "g.h.i"]);
    }

    #[test]
    fn split_keeps_interior_blank_lines() {
        let lines: Vec<&str> = split_tokens("a.b.c\n\nd.e.f").collect();
        assert_eq!(lines, vec!["a.b.c", "", "d.e.f"]);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            "application/passport; charset=utf-8".parse().unwrap(),
        );
        assert!(content_type_is_passport(&headers));

        headers.insert(CONTENT_TYPE, "Application/Passport".parse().unwrap());
        assert!(content_type_is_passport(&headers));

        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!content_type_is_passport(&headers));

        assert!(!content_type_is_passport(&HeaderMap::new()));
    }
}
