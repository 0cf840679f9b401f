//! AD-specific LDAP request controls.

use ad_connector::error::{ConnectorError, ConnectorResult};
use bytes::BytesMut;
use ldap3::asn1::{write, ASNTag, Integer, Sequence, Tag};
use ldap3::controls::RawControl;

/// OID of `LDAP_SERVER_EXTENDED_DN_OID`.
pub const EXTENDED_DN_OID: &str = "1.2.840.113556.1.4.529";

/// Output format requested through the extended-DN control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtendedDnFormat {
    /// GUID and SID as hexadecimal strings.
    #[default]
    Hex = 0,
    /// GUID in dashed form and SID in `S-1-...` form.
    Standard = 1,
}

/// Build the extended-DN control.
///
/// With it, search results carry DNs like `<GUID=..>;<SID=..>;CN=...`.
/// The control is non-critical so servers without support still answer.
pub fn extended_dn_control(format: ExtendedDnFormat) -> ConnectorResult<RawControl> {
    Ok(RawControl {
        ctype: EXTENDED_DN_OID.to_string(),
        crit: false,
        val: Some(encode_extended_dn_value(format)?),
    })
}

/// Encode the control value `SEQUENCE { INTEGER flag }`.
fn encode_extended_dn_value(format: ExtendedDnFormat) -> ConnectorResult<Vec<u8>> {
    let value = Tag::Sequence(Sequence {
        inner: vec![Tag::Integer(Integer {
            inner: format as i64,
            ..Default::default()
        })],
        ..Default::default()
    });

    let mut buf = BytesMut::new();
    write::encode_into(&mut buf, value.into_structure()).map_err(|e| {
        ConnectorError::invalid_data(format!("cannot encode extended-DN control: {e}"))
    })?;
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_dn_control_hex() {
        let control = extended_dn_control(ExtendedDnFormat::Hex).unwrap();
        assert_eq!(control.ctype, "1.2.840.113556.1.4.529");
        assert!(!control.crit);
        assert_eq!(control.val, Some(vec![0x30, 0x03, 0x02, 0x01, 0x00]));
    }

    #[test]
    fn test_extended_dn_control_standard() {
        let control = extended_dn_control(ExtendedDnFormat::Standard).unwrap();
        assert_eq!(control.val, Some(vec![0x30, 0x03, 0x02, 0x01, 0x01]));
    }
}
