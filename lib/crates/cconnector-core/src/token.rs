//! Bearer token generation.

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// Number of random bytes in a host token (64 hex characters).
pub const DEFAULT_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token length must be greater than zero")]
    InvalidLength,

    #[error("failed to read from the operating system random source")]
    Entropy(#[source] rand::Error),
}

/// Generate `length` bytes from the OS CSPRNG, hex encoded.
///
/// The result is `2 * length` lowercase hexadecimal characters.
pub fn generate(length: usize) -> Result<String, TokenError> {
    if length == 0 {
        return Err(TokenError::InvalidLength);
    }
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(TokenError::Entropy)?;
    Ok(hex::encode(bytes))
}
