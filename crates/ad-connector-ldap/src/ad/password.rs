//! AD password operations using unicodePwd attribute encoding.
//!
//! Active Directory requires passwords to be set via the `unicodePwd` attribute
//! using a specific encoding:
//! 1. Surround the password with double quotes: `"password"`
//! 2. Encode the quoted string as UTF-16LE bytes
//!
//! AD rejects unicodePwd modifications over unencrypted connections.

use ad_connector::error::{ConnectorError, ConnectorResult};
use ad_connector::operation::{AttributeDelta, AttributeValue};
use tracing::instrument;

/// Attribute holding the AD password.
pub const UNICODE_PWD: &str = "unicodePwd";

/// Encode a plaintext password for AD's unicodePwd attribute.
///
/// # Errors
/// Returns an error if the password is empty.
#[instrument(skip(password))]
pub fn encode_ad_password(password: &str) -> ConnectorResult<Vec<u8>> {
    if password.is_empty() {
        return Err(ConnectorError::invalid_data("password cannot be empty"));
    }

    let quoted = format!("\"{password}\"");

    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// Validate that the connection is suitable for password operations.
#[instrument]
pub fn validate_password_connection(use_ssl: bool) -> ConnectorResult<()> {
    if !use_ssl {
        return Err(ConnectorError::invalid_configuration(
            "LDAPS (SSL) connection required for password operations; \
             AD rejects unicodePwd modifications over non-encrypted connections",
        ));
    }
    Ok(())
}

/// Build the modification that resets a password.
#[instrument(skip(password))]
pub fn build_password_modify(password: &str, use_ssl: bool) -> ConnectorResult<AttributeDelta> {
    validate_password_connection(use_ssl)?;
    let encoded = encode_ad_password(password)?;

    let mut delta = AttributeDelta::new();
    delta.replace(UNICODE_PWD, AttributeValue::Binary(encoded));
    Ok(delta)
}
