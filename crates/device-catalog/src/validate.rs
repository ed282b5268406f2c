//! Record validation rules.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use device_xml::{fields, DeviceRecord};

/// Why a record failed a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The field the rule inspects is absent.
    Missing,
    /// The field is present but its value is not acceptable.
    Invalid { value: String, reason: String },
}

/// A single rule failure for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{} is missing", self.field),
            ViolationKind::Invalid { value, reason } => {
                write!(f, "{} {value:?} is invalid: {reason}", self.field)
            }
        }
    }
}

/// Check applied to every record before it enters the catalog.
pub trait Rule {
    /// Short identifier used in log output.
    fn name(&self) -> &'static str;
    /// Inspect `record`, reporting the first problem found.
    fn check(&self, record: &DeviceRecord) -> Result<(), Violation>;
}

/// `Address` must be a numeric IPv4 or IPv6 address, see [`parse_address`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressRule;

impl Rule for AddressRule {
    fn name(&self) -> &'static str {
        "address"
    }

    fn check(&self, record: &DeviceRecord) -> Result<(), Violation> {
        let value = record.get(fields::ADDRESS).ok_or(Violation {
            field: fields::ADDRESS,
            kind: ViolationKind::Missing,
        })?;
        match parse_address(value) {
            Some(_) => Ok(()),
            None => Err(Violation {
                field: fields::ADDRESS,
                kind: ViolationKind::Invalid {
                    value: value.to_string(),
                    reason: "not an IPv4 or IPv6 address".into(),
                },
            }),
        }
    }
}

/// Parse a numeric IP address.
///
/// Besides the canonical forms this accepts an IPv6 zone suffix
/// (`fe80::1%4`, `fe80::1%eth0`) and IPv4 written with one to four parts,
/// each decimal, octal (leading `0`) or hex (`0x`). The last part fills the
/// remaining bytes, so `127.1` is `127.0.0.1` and `10.0.0` is `10.0.0.0`.
pub fn parse_address(text: &str) -> Option<IpAddr> {
    if let Ok(addr) = text.parse::<IpAddr>() {
        return Some(addr);
    }
    if text.contains(':') {
        parse_scoped_v6(text).map(IpAddr::V6)
    } else {
        parse_v4_parts(text).map(IpAddr::V4)
    }
}

fn parse_scoped_v6(text: &str) -> Option<Ipv6Addr> {
    let (addr, zone) = text.split_once('%')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    addr.parse().ok()
}

fn parse_v4_parts(text: &str) -> Option<Ipv4Addr> {
    let parts = text
        .split('.')
        .map(parse_v4_part)
        .collect::<Option<Vec<u64>>>()?;
    if parts.len() > 4 {
        return None;
    }
    let (last, leading) = parts.split_last()?;
    if leading.iter().any(|&part| part > 0xFF) {
        return None;
    }
    let last_bits = 8 * (4 - leading.len());
    if *last >> last_bits != 0 {
        return None;
    }
    let mut addr = *last as u32;
    for (idx, &part) in leading.iter().enumerate() {
        addr |= (part as u32) << (24 - 8 * idx);
    }
    Some(Ipv4Addr::from(addr))
}

fn parse_v4_part(part: &str) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
    {
        (hex, 16)
    } else if part.len() > 1 && part.starts_with('0') {
        (&part[1..], 8)
    } else {
        (part, 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Ordered set of rules. The first failing rule decides the outcome.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    /// A validator with no rules; every record passes.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append `rule` after the existing ones.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Run every rule in order against `record`.
    pub fn validate(&self, record: &DeviceRecord) -> Result<(), Violation> {
        self.rules.iter().try_for_each(|rule| rule.check(record))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::empty().with_rule(AddressRule)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_address(address: &str) -> DeviceRecord {
        [(fields::ADDRESS, address)].into_iter().collect()
    }

    #[test]
    fn address_accepts_ipv4_and_ipv6() {
        for address in ["10.0.0.1", "255.255.255.255", "::1", "fe80::1", "2001:db8::8a2e:370:7334"] {
            assert_eq!(AddressRule.check(&with_address(address)), Ok(()), "{address}");
        }
    }

    #[test]
    fn address_rejects_garbage() {
        for address in [
            "not-an-ip",
            "",
            "256.1.1.1",
            "10.0.0.1:80",
            "10..1",
            "10.0.0.",
            "1.2.3.4.5",
            "10.0.0.256",
            "09.1.1.1",
            "0x.1.1.1",
            "fe80::1%",
            "fe80::1%e/0",
            "10.0.0.1%4",
        ] {
            let violation = AddressRule.check(&with_address(address)).unwrap_err();
            assert_eq!(violation.field, fields::ADDRESS);
            assert!(
                matches!(violation.kind, ViolationKind::Invalid { ref value, .. } if value == address),
                "{address}"
            );
        }
    }

    #[test]
    fn address_accepts_short_and_scoped_forms() {
        for address in ["fe80::1%4", "fe80::1%eth0", "10.1", "127.1", "10.0.0", "0x0A.0.0.1", "1"] {
            assert_eq!(AddressRule.check(&with_address(address)), Ok(()), "{address}");
        }
    }

    #[test]
    fn short_ipv4_fills_trailing_bytes() {
        let cases: [(&str, [u8; 4]); 7] = [
            ("127.1", [127, 0, 0, 1]),
            ("10.1", [10, 0, 0, 1]),
            ("10.0.0", [10, 0, 0, 0]),
            ("10.0.258", [10, 0, 1, 2]),
            ("0x0A.0.0.1", [10, 0, 0, 1]),
            ("012.0.0.1", [10, 0, 0, 1]),
            ("3232235777", [192, 168, 1, 1]),
        ];
        for (text, octets) in cases {
            assert_eq!(
                parse_address(text),
                Some(IpAddr::V4(Ipv4Addr::from(octets))),
                "{text}"
            );
        }
        assert_eq!(parse_address("4294967296"), None);
        assert_eq!(parse_address("1.16777216"), None);
    }

    #[test]
    fn scoped_ipv6_drops_zone() {
        assert_eq!(
            parse_address("fe80::1%4"),
            Some(IpAddr::V6("fe80::1".parse().expect("ipv6")))
        );
    }

    #[test]
    fn address_missing_is_reported() {
        let violation = AddressRule.check(&DeviceRecord::new()).unwrap_err();
        assert_eq!(violation.kind, ViolationKind::Missing);
    }

    struct NeedsName;

    impl Rule for NeedsName {
        fn name(&self) -> &'static str {
            "name"
        }

        fn check(&self, record: &DeviceRecord) -> Result<(), Violation> {
            match record.get(fields::DEV_NAME) {
                Some(_) => Ok(()),
                None => Err(Violation {
                    field: fields::DEV_NAME,
                    kind: ViolationKind::Missing,
                }),
            }
        }
    }

    #[test]
    fn rules_run_in_order() {
        let validator = Validator::default().with_rule(NeedsName);
        assert_eq!(validator.rule_names(), ["address", "name"]);

        let violation = validator.validate(&with_address("bogus")).unwrap_err();
        assert_eq!(violation.field, fields::ADDRESS);

        let violation = validator.validate(&with_address("10.0.0.1")).unwrap_err();
        assert_eq!(violation.field, fields::DEV_NAME);

        assert!(Validator::empty().validate(&DeviceRecord::new()).is_ok());
    }
}
