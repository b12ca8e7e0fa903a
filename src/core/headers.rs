//! HTTP header names used by the gateway.

/// API key presented by clients; takes precedence for quota identification.
pub const X_API_KEY: &str = "x-api-key";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers meaningful only for a single transport leg; never relayed.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is hop-by-hop. The comparison ignores ASCII case.
pub fn is_hop_by_hop(header_name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(header_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_ignores_case() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("TRANSFER-ENCODING"));
        assert!(is_hop_by_hop("keep-alive"));
        assert!(is_hop_by_hop("Proxy-Authorization"));
    }

    #[test]
    fn test_every_hop_by_hop_header_in_mixed_case() {
        assert_eq!(HOP_BY_HOP_HEADERS.len(), 8);
        for name in [
            "Connection",
            "KEEP-ALIVE",
            "Proxy-Authenticate",
            "proxy-AUTHORIZATION",
            "Te",
            "Trailers",
            "Transfer-Encoding",
            "UpGrade",
        ] {
            assert!(is_hop_by_hop(name), "{name} should be hop-by-hop");
        }
    }

    #[test]
    fn test_end_to_end_headers_are_not_hop_by_hop() {
        assert!(!is_hop_by_hop("content-type"));
        assert!(!is_hop_by_hop("authorization"));
        assert!(!is_hop_by_hop("x-forwarded-for"));
        assert!(!is_hop_by_hop("tea"));
    }
}
