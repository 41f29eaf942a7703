//! Page-token codec.
//!
//! Translates between the framework's opaque continuation token and the
//! offset/limit pair the role-store API expects. The token is the decimal
//! offset of the next item to fetch; the empty string means both "start" and
//! "no more pages".

use serde::{Deserialize, Serialize};

use crate::error::PageTokenError;

/// Page size used when the caller does not request one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Continuation token plus requested page size, as handed in by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub token: String,
    /// Requested page size; 0 means [`DEFAULT_PAGE_SIZE`].
    pub size: u32,
}

impl PageToken {
    /// First page with the given size.
    pub fn first(size: u32) -> Self {
        Self {
            token: String::new(),
            size,
        }
    }

    /// Continue from `token` keeping the same page size.
    pub fn resume(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            size: self.size,
        }
    }

    /// Effective page size.
    pub fn limit(&self) -> u32 {
        if self.size > 0 {
            self.size
        } else {
            DEFAULT_PAGE_SIZE
        }
    }
}

/// Decode a continuation token into an offset. The empty token is offset 0.
pub fn decode_offset(token: &str) -> Result<u64, PageTokenError> {
    if token.is_empty() {
        return Ok(0);
    }

    token.parse::<u64>().map_err(|source| PageTokenError {
        token: token.to_string(),
        source,
    })
}

/// Encode an offset as a continuation token.
pub fn encode_offset(offset: u64) -> String {
    offset.to_string()
}

/// Parse a page token into `(offset, limit)`.
pub fn parse_page_token(page_token: &PageToken) -> Result<(u64, u32), PageTokenError> {
    let offset = decode_offset(&page_token.token)?;
    Ok((offset, page_token.limit()))
}

/// Compute the token for the page after one that started at `offset` and
/// returned `found` items out of `page_size` requested.
///
/// A short page ends the stream. A full page always yields another token, so a
/// listing whose size is an exact multiple of `page_size` costs one extra,
/// empty fetch.
pub fn next_token(offset: u64, found: usize, page_size: u32) -> String {
    if found < page_size as usize {
        return String::new();
    }

    encode_offset(offset.saturating_add(found as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_is_zero() {
        assert_eq!(decode_offset("").unwrap(), 0);
    }

    #[test]
    fn test_decode_encode_inverse() {
        let dense = 0u64..10_000;
        let powers = (0..64).flat_map(|shift| {
            let p = 1u64 << shift;
            [p - 1, p, p + 1]
        });
        let boundaries = [u32::MAX as u64, u64::MAX - 1, u64::MAX];

        for n in dense.chain(powers).chain(boundaries) {
            assert_eq!(decode_offset(&encode_offset(n)).unwrap(), n);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_offset("abc").unwrap_err();
        assert_eq!(err.token, "abc");
        assert!(decode_offset("-5").is_err());
        assert!(decode_offset("1.5").is_err());
        assert!(decode_offset(" 7").is_err());
    }

    #[test]
    fn test_next_token_short_page_ends_stream() {
        assert_eq!(next_token(0, 0, 100), "");
        assert_eq!(next_token(200, 99, 100), "");
        assert_eq!(next_token(100, 2, 3), "");
    }

    #[test]
    fn test_next_token_full_page_continues() {
        assert_eq!(next_token(0, 3, 3), "3");
        assert_eq!(next_token(100, 3, 3), "103");
        assert_eq!(next_token(0, 100, 100), "100");
    }

    #[test]
    fn test_parse_page_token_defaults() {
        let (offset, limit) = parse_page_token(&PageToken::default()).unwrap();
        assert_eq!((offset, limit), (0, DEFAULT_PAGE_SIZE));

        let token = PageToken {
            token: "100".into(),
            size: 3,
        };
        assert_eq!(parse_page_token(&token).unwrap(), (100, 3));
        assert!(parse_page_token(&token.resume("x")).is_err());
    }

    #[test]
    fn test_resume_keeps_size() {
        let first = PageToken::first(25);
        let next = first.resume("25");
        assert_eq!(next.size, 25);
        assert_eq!(next.token, "25");
    }
}
