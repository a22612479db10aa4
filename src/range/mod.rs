//! Range codec for IP ownership queries
//!
//! IP text is encoded as fixed-width big-endian bytes (4 for IPv4, 16 for
//! IPv6) so that byte-lexicographic order equals numeric address order.
//! Ordering is only defined within one version; comparing an IPv4 encoding
//! with an IPv6 encoding is an error, never a silent `false`.

use crate::error::{CanonError, FormatError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

/// IP protocol version of an encoded address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// 4 or 6
    pub fn number(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Encoded byte width
    pub fn width(self) -> usize {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 16,
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(version: IpVersion) -> Self {
        version.number()
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(format!("IP version must be 4 or 6, got {other}")),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

/// An address in its fixed-width big-endian encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedIp {
    version: IpVersion,
    bytes: Vec<u8>,
}

impl EncodedIp {
    /// Rebuild an encoding read back from storage
    pub fn from_bytes(version: IpVersion, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != version.width() {
            return Err(CanonError::InvalidField {
                entity: "ip_range",
                field: "bytes",
                message: format!(
                    "{} encoding must be {} bytes, got {}",
                    version,
                    version.width(),
                    bytes.len()
                ),
            });
        }
        Ok(Self { version, bytes })
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode back to an address
    pub fn to_addr(&self) -> IpAddr {
        match self.version {
            IpVersion::V4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.bytes);
                IpAddr::from(octets)
            }
            IpVersion::V6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&self.bytes);
                IpAddr::from(octets)
            }
        }
    }
}

impl From<IpAddr> for EncodedIp {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self {
                version: IpVersion::V4,
                bytes: v4.octets().to_vec(),
            },
            IpAddr::V6(v6) => Self {
                version: IpVersion::V6,
                bytes: v6.octets().to_vec(),
            },
        }
    }
}

/// Encode IPv4 or IPv6 literal text
pub fn encode(text: &str) -> std::result::Result<EncodedIp, FormatError> {
    text.parse::<IpAddr>()
        .map(EncodedIp::from)
        .map_err(|_| FormatError::InvalidIpAddress(text.to_string()))
}

/// Byte-lexicographic comparison, defined only within one version
pub fn compare(a: &EncodedIp, b: &EncodedIp) -> Result<Ordering> {
    if a.version != b.version {
        return Err(CanonError::CrossVersionComparison {
            left: a.version.number(),
            right: b.version.number(),
        });
    }
    Ok(a.bytes.cmp(&b.bytes))
}

/// An inclusive address range of a single version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRange {
    start: EncodedIp,
    end: EncodedIp,
}

impl IpRange {
    /// Build a range, rejecting mixed versions and `start > end`
    pub fn new(start: EncodedIp, end: EncodedIp) -> Result<Self> {
        if compare(&start, &end)? == Ordering::Greater {
            return Err(CanonError::InvalidField {
                entity: "ip_range",
                field: "range_start",
                message: format!("{} is after {}", start.to_addr(), end.to_addr()),
            });
        }
        Ok(Self { start, end })
    }

    /// Build a range from address text
    pub fn from_text(start: &str, end: &str) -> Result<Self> {
        Self::new(encode(start)?, encode(end)?)
    }

    pub fn version(&self) -> IpVersion {
        self.start.version
    }

    pub fn start(&self) -> &EncodedIp {
        &self.start
    }

    pub fn end(&self) -> &EncodedIp {
        &self.end
    }

    /// `start <= addr <= end`; errors if `addr` is of the other version
    pub fn contains(&self, addr: &EncodedIp) -> Result<bool> {
        Ok(compare(&self.start, addr)? != Ordering::Greater
            && compare(addr, &self.end)? != Ordering::Greater)
    }
}

/// Ranges containing `addr`, after filtering out ranges of the other version
pub fn containing<'a, I>(ranges: I, addr: &EncodedIp) -> Vec<&'a IpRange>
where
    I: IntoIterator<Item = &'a IpRange>,
{
    ranges
        .into_iter()
        .filter(|range| range.version() == addr.version())
        .filter(|range| range.contains(addr).unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_widths() {
        let v4 = encode("4.4.4.4").unwrap();
        assert_eq!(v4.version(), IpVersion::V4);
        assert_eq!(v4.bytes(), &[4, 4, 4, 4]);

        let v6 = encode("64:ff9b::1:0:0").unwrap();
        assert_eq!(v6.version(), IpVersion::V6);
        assert_eq!(v6.bytes().len(), 16);
        assert_eq!(&v6.bytes()[..4], &[0x00, 0x64, 0xff, 0x9b]);
    }

    #[test]
    fn test_encode_rejects_non_literals() {
        for bad in ["0", "", "256.1.1.1", "example.com", "1.2.3"] {
            assert_eq!(
                encode(bad),
                Err(FormatError::InvalidIpAddress(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_byte_order_matches_numeric_order() {
        let low = encode("9.255.255.255").unwrap();
        let high = encode("10.0.0.0").unwrap();
        assert_eq!(compare(&low, &high).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_cross_version_comparison_is_rejected() {
        let v4 = encode("4.4.4.4").unwrap();
        let v6 = encode("::1").unwrap();
        assert!(matches!(
            compare(&v4, &v6),
            Err(CanonError::CrossVersionComparison { left: 4, right: 6 })
        ));
        assert!(IpRange::from_text("1.0.0.0", "::1").is_err());
    }

    #[test]
    fn test_range_containment() {
        let v4 = IpRange::from_text("4.0.0.0", "4.7.168.255").unwrap();
        let v6 = IpRange::from_text("64:ff9b::1:0:0", "100::ffff:ffff:ffff:ffff").unwrap();
        let target = encode("4.4.4.4").unwrap();

        assert!(v4.contains(&target).unwrap());
        assert!(v6.contains(&target).is_err());

        let ranges = vec![v4.clone(), v6];
        let hits = containing(&ranges, &target);
        assert_eq!(hits, vec![&v4]);

        let outside = encode("4.7.169.0").unwrap();
        assert!(containing(&ranges, &outside).is_empty());
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(matches!(
            IpRange::from_text("10.0.0.1", "10.0.0.0"),
            Err(CanonError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_from_bytes_checks_width() {
        assert!(EncodedIp::from_bytes(IpVersion::V4, vec![1, 2, 3, 4]).is_ok());
        assert!(EncodedIp::from_bytes(IpVersion::V6, vec![1, 2, 3, 4]).is_err());
    }
}
