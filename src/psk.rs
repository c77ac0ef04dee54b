//! Pre-Shared Key Material
//!
//! Random key generation and hex encoding for callers that authenticate
//! connections before handing them to the relay.

use anyhow::Context;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::Result;

/// Generate `length` random bytes from the OS CSPRNG
pub fn generate_key(length: usize) -> Result<Vec<u8>> {
    let mut key = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut key)
        .context("random bytes generation failed")?;
    Ok(key)
}

/// Generate a random key and return it as lowercase hex
pub fn generate_key_hex(length: usize) -> Result<String> {
    let key = generate_key(length).context("can't generate hex key")?;
    Ok(hex::encode(key))
}

/// Decode a hex-encoded key
pub fn parse_key_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input).with_context(|| format!("invalid hex key ({} chars)", input.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_generate_key_length() {
        assert_eq!(assert_ok!(generate_key(32)).len(), 32);
        assert!(assert_ok!(generate_key(0)).is_empty());
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = generate_key(32).unwrap();
        let b = generate_key(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_key_parses_back() {
        let encoded = generate_key_hex(16).unwrap();
        assert_eq!(encoded.len(), 32);
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let decoded = parse_key_hex(&encoded).unwrap();
        assert_eq!(hex::encode(&decoded), encoded);
    }

    #[test]
    fn test_parse_key_hex() {
        assert_eq!(parse_key_hex("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert_eq!(parse_key_hex("ABcd").unwrap(), vec![0xab, 0xcd]);
        assert!(parse_key_hex("").unwrap().is_empty());

        assert_err!(parse_key_hex("abc"));
        assert_err!(parse_key_hex("zz"));
    }
}
