//! Role inference for freshly issued tokens.
//!
//! The role claim is read without verifying the token's signature. It only
//! picks which storage slot a credential lands in and must never be used to
//! grant or deny access; the issuing backend remains the authority.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use paydesk_common::Role;
use serde_json::Value;
use tracing::{debug, warn};

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Pick the role for `token`: explicit argument, then the decoded claim,
/// then [`Role::Merchant`]. Never fails.
pub fn resolve_role(token: &str, explicit: Option<Role>) -> Role {
    explicit
        .or_else(|| decode_role_claim(token))
        .unwrap_or_default()
}

/// Best-effort read of `user.role` (or top-level `role`) from the token's
/// middle segment. Returns `None` on any decode problem.
pub fn decode_role_claim(token: &str) -> Option<Role> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            warn!("token has no claims segment, falling back to default role");
            return None;
        }
    };

    let bytes = match STANDARD_LENIENT
        .decode(payload)
        .or_else(|_| URL_SAFE_LENIENT.decode(payload))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to decode token claims: {e}");
            return None;
        }
    };

    let claims: Value = match serde_json::from_slice(&bytes) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("token claims are not valid JSON: {e}");
            return None;
        }
    };

    let claim = claims
        .pointer("/user/role")
        .or_else(|| claims.get("role"))
        .and_then(Value::as_str);

    match claim {
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!("ignoring role claim: {e}");
                None
            }
        },
        None => {
            debug!("token carries no role claim");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT_TOKEN: &str = "abc.eyJ1c2VyIjp7InJvbGUiOiJtZXJjaGFudCJ9fQ.xyz";
    const ADMIN_TOKEN: &str = "hdr.eyJ1c2VyIjp7InJvbGUiOiJhZG1pbiJ9fQ==.sig";

    #[test]
    fn decodes_nested_role_claim_without_padding() {
        assert_eq!(decode_role_claim(MERCHANT_TOKEN), Some(Role::Merchant));
    }

    #[test]
    fn decodes_padded_admin_claim() {
        assert_eq!(decode_role_claim(ADMIN_TOKEN), Some(Role::Admin));
    }

    #[test]
    fn falls_back_to_top_level_role() {
        assert_eq!(
            decode_role_claim("h.eyJyb2xlIjoiYWRtaW4ifQ.s"),
            Some(Role::Admin)
        );
    }

    #[test]
    fn accepts_url_safe_alphabet() {
        // payload contains '-' which only the URL-safe alphabet accepts
        let token = "h.eyJ1c2VyIjp7InJvbGUiOiJhZG1pbiIsIm5hbWUiOiLDqT8-In19.s";
        assert_eq!(decode_role_claim(token), Some(Role::Admin));
    }

    #[test]
    fn malformed_tokens_yield_none() {
        assert_eq!(decode_role_claim("opaque-token"), None);
        assert_eq!(decode_role_claim("a..b"), None);
        assert_eq!(decode_role_claim("a.!!!not-base64!!!.b"), None);
        // valid base64, not JSON
        assert_eq!(decode_role_claim("a.aGVsbG8.b"), None);
        // JSON without a role
        assert_eq!(decode_role_claim("a.eyJzdWIiOiJ1MSJ9.b"), None);
        // role outside the known set
        assert_eq!(
            decode_role_claim("a.eyJ1c2VyIjp7InJvbGUiOiJvd25lciJ9fQ.b"),
            None
        );
    }

    #[test]
    fn explicit_role_wins() {
        assert_eq!(resolve_role(MERCHANT_TOKEN, Some(Role::Admin)), Role::Admin);
    }

    #[test]
    fn undecodable_token_defaults_to_merchant() {
        assert_eq!(resolve_role("not-a-jwt", None), Role::Merchant);
        assert_eq!(resolve_role(ADMIN_TOKEN, None), Role::Admin);
    }
}
