//! TLS pre-shared key material for the agent connection.

use crate::error::WizardError;
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt::Write;

const IDENTITY_SUFFIX: &str = " PSK";

/// Generates `bytes` random bytes, hex-encoded in lowercase.
pub fn generate_psk(bytes: usize) -> Result<String, WizardError> {
    let mut buf = vec![0u8; bytes];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| WizardError::Internal("failed to generate PSK".to_string()))?;

    let mut hex = String::with_capacity(bytes * 2);
    for b in &buf {
        // Writing to a String cannot fail.
        let _ = write!(hex, "{:02x}", b);
    }
    Ok(hex)
}

/// PSK identity derived from the host name: `"<host name> PSK"`.
///
/// The host name is truncated on a character boundary so the identity fits
/// in `max_length` characters.
pub fn psk_identity(host: &str, max_length: usize) -> String {
    let room = max_length.saturating_sub(IDENTITY_SUFFIX.chars().count());
    let name: String = host.trim().chars().take(room).collect();
    format!("{}{}", name, IDENTITY_SUFFIX).trim().to_string()
}
