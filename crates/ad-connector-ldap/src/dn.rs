//! Distinguished Name utilities.
//!
//! Parsing of AD extended DNs, objectGUID filter values, RDN splitting and
//! conversions between dotted domain names and `dc=` DNs.

use std::sync::LazyLock;

use regex::Regex;

static EXTENDED_DN_WITH_SID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<GUID=([^>]*)>;<SID=([^>]*)>;(.*)$")
        .expect("EXTENDED_DN_WITH_SID is a valid regex pattern")
});

static EXTENDED_DN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<GUID=([^>]*)>;(.*)$").expect("EXTENDED_DN is a valid regex pattern")
});

static DOMAIN_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)dc=(\w*),?").expect("DOMAIN_COMPONENT is a valid regex pattern")
});

/// A DN as returned under the AD extended-DN control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedDn {
    /// Hexadecimal objectGUID, empty when the input carried none.
    pub guid: String,
    /// Object SID, present for security principals.
    pub sid: Option<String>,
    /// The plain DN.
    pub dn: String,
}

impl ExtendedDn {
    /// Parse `<GUID=g>;<SID=s>;dn` or `<GUID=g>;dn`.
    ///
    /// GUID and SID values stop at the first `>`, which AD never emits
    /// inside them. Any other input is returned as a plain DN with an empty
    /// GUID.
    pub fn parse(value: &str) -> Self {
        if let Some(caps) = EXTENDED_DN_WITH_SID.captures(value) {
            return Self {
                guid: caps[1].to_string(),
                sid: Some(caps[2].to_string()),
                dn: caps[3].to_string(),
            };
        }

        if let Some(caps) = EXTENDED_DN.captures(value) {
            return Self {
                guid: caps[1].to_string(),
                sid: None,
                dn: caps[2].to_string(),
            };
        }

        tracing::debug!(dn = %value, "value is not an extended DN");
        Self {
            guid: String::new(),
            sid: None,
            dn: value.to_string(),
        }
    }
}

/// Split an extended DN into `(guid, dn)`.
pub fn parse_extended_dn(value: &str) -> (String, String) {
    let parsed = ExtendedDn::parse(value);
    (parsed.guid, parsed.dn)
}

/// Render a hexadecimal objectGUID as an escaped filter value.
///
/// Every pair of hex digits becomes one `\xx` octet escape, so
/// `"a1b2"` becomes `"\a1\b2"`.
pub fn object_guid_query(hex_guid: &str) -> String {
    let mut result = String::with_capacity(hex_guid.len() * 3 / 2 + 1);
    for (i, ch) in hex_guid.chars().enumerate() {
        if i % 2 == 0 {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}

/// Split `identifier=NAME,PARENT` into `(NAME, PARENT)`.
///
/// The identifier is matched case-insensitively and NAME may only hold word
/// characters, hyphens and spaces. Other inputs yield `("", dn)`.
pub fn parse_dn(dn: &str, identifier: &str) -> (String, String) {
    let unmatched = || (String::new(), dn.to_string());

    let Some(head) = dn.get(..identifier.len()) else {
        return unmatched();
    };
    if !head.eq_ignore_ascii_case(identifier) {
        return unmatched();
    }

    let Some(rest) = dn[identifier.len()..].strip_prefix('=') else {
        return unmatched();
    };
    let Some((name, parent)) = rest.split_once(',') else {
        return unmatched();
    };

    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ');
    if !valid {
        return unmatched();
    }

    (name.to_string(), parent.to_string())
}

/// Collect all `dc=` components of a DN, e.g. `"ou=x,DC=a,dc=b"` gives
/// `"dc=a,dc=b"`. A DN without domain components is returned unchanged.
pub fn extract_domain_from_dn(dn: &str) -> String {
    let components: Vec<String> = DOMAIN_COMPONENT
        .captures_iter(dn)
        .map(|caps| format!("dc={}", &caps[1]))
        .collect();

    if components.is_empty() {
        dn.to_string()
    } else {
        components.join(",")
    }
}

/// `"example.com"` to `"dc=example,dc=com"`.
pub fn domain_to_dn(domain: &str) -> String {
    domain
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| format!("dc={part}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `"dc=example,dc=com"` to `"example.com"`. Non-`dc` components are ignored.
pub fn dn_to_domain(dn: &str) -> String {
    DOMAIN_COMPONENT
        .captures_iter(dn)
        .map(|caps| caps[1].to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Escape special characters in DN attribute values per RFC 4514.
///
/// Characters that must be escaped:
/// - Leading or trailing SPACE (escaped as \20)
/// - Leading # (escaped as \23)
/// - Characters: , + " \ < > ; = (escaped with backslash prefix)
/// - NUL character (escaped as \00)
pub fn escape_dn_value(value: &str) -> String {
    let count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Build an escaped RDN such as `cn=Smith\, John`.
pub fn rdn(attribute: &str, value: &str) -> String {
    format!("{}={}", attribute, escape_dn_value(value))
}

/// Split a DN into its first RDN and the parent DN, honouring escaped commas.
///
/// `"cn=a\,b,ou=x,dc=y"` gives `("cn=a\,b", "ou=x,dc=y")`. A single-RDN
/// input has an empty parent.
pub fn split_dn(dn: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, ch) in dn.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return (&dn[..i], &dn[i + 1..]),
            _ => escaped = false,
        }
    }
    (dn, "")
}

/// Compare two DNs ignoring ASCII case and spaces after separators.
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// Lowercase a DN and drop spaces that follow RDN separators.
pub fn normalize_dn(dn: &str) -> String {
    let mut out = String::with_capacity(dn.len());
    let mut after_separator = false;
    for ch in dn.chars() {
        if after_separator && ch == ' ' {
            continue;
        }
        after_separator = ch == ',';
        out.extend(ch.to_lowercase());
    }
    out
}
