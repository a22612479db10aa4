use super::{Entity, EntityKind, NaturalKey};
use crate::config::MutableFieldPolicy;
use crate::error::Result;
use crate::grammar::{asn, AsnAttributes};
use crate::range::{EncodedIp, IpRange, IpVersion};
use crate::resolve::Resolver;
use serde::{Deserialize, Serialize};

/// Autonomous-system ownership of one address range
///
/// `name` and `country_code` are the only fields a later import may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnRecord {
    pub version: IpVersion,
    pub range_start: String,
    pub range_end: String,
    pub range_start_bytes: Vec<u8>,
    pub range_end_bytes: Vec<u8>,
    pub number: u32,
    pub country_code: Option<String>,
    pub name: Option<String>,
}

impl AsnRecord {
    /// Encoded range rebuilt from the stored bytes
    pub fn range(&self) -> Result<IpRange> {
        IpRange::new(
            EncodedIp::from_bytes(self.version, self.range_start_bytes.clone())?,
            EncodedIp::from_bytes(self.version, self.range_end_bytes.clone())?,
        )
    }
}

fn merge_field(
    stored: &mut Option<String>,
    incoming: &Option<String>,
    policy: MutableFieldPolicy,
) -> bool {
    let Some(incoming) = incoming else {
        return false;
    };
    let replace = match policy {
        MutableFieldPolicy::LastWriteWins => stored.as_ref() != Some(incoming),
        MutableFieldPolicy::FirstWriteWins => stored.is_none(),
    };
    if replace {
        *stored = Some(incoming.clone());
    }
    replace
}

impl Entity for AsnRecord {
    type Input = str;
    type Attributes = AsnAttributes;

    const KIND: EntityKind = EntityKind::Asn;

    fn parse(input: &str) -> Result<AsnAttributes> {
        Ok(asn::parse_line(input)?)
    }

    fn derive_key(attributes: &AsnAttributes) -> NaturalKey {
        NaturalKey::from_parts(vec![
            Some(attributes.range_start.clone()),
            Some(attributes.range_end.clone()),
        ])
    }

    fn validate(attributes: &AsnAttributes) -> Result<()> {
        IpRange::from_text(&attributes.range_start, &attributes.range_end)?;
        Ok(())
    }

    fn build(_resolver: &Resolver, attributes: AsnAttributes) -> Result<Self> {
        let range = IpRange::from_text(&attributes.range_start, &attributes.range_end)?;

        Ok(Self {
            version: range.version(),
            range_start_bytes: range.start().bytes().to_vec(),
            range_end_bytes: range.end().bytes().to_vec(),
            range_start: attributes.range_start,
            range_end: attributes.range_end,
            number: attributes.number,
            country_code: attributes.country_code,
            name: attributes.name,
        })
    }

    fn natural_key(&self) -> NaturalKey {
        NaturalKey::from_parts(vec![
            Some(self.range_start.clone()),
            Some(self.range_end.clone()),
        ])
    }

    fn ip_range(&self) -> Option<IpRange> {
        self.range().ok()
    }

    fn refresh(&mut self, incoming: &AsnAttributes, policy: MutableFieldPolicy) -> bool {
        let name = merge_field(&mut self.name, &incoming.name, policy);
        let country = merge_field(&mut self.country_code, &incoming.country_code, policy);
        name || country
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanonError;

    fn record(line: &str) -> AsnRecord {
        let attrs = AsnRecord::parse(line).unwrap();
        AsnRecord {
            version: attrs.version,
            range_start_bytes: Vec::new(),
            range_end_bytes: Vec::new(),
            range_start: attrs.range_start,
            range_end: attrs.range_end,
            number: attrs.number,
            country_code: attrs.country_code,
            name: attrs.name,
        }
    }

    #[test]
    fn test_inverted_range_fails_validation() {
        let attrs = AsnRecord::parse("10.0.0.1\t10.0.0.0\t64500\tUS\tEXAMPLE").unwrap();
        assert!(matches!(
            AsnRecord::validate(&attrs),
            Err(CanonError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_last_write_wins_refresh() {
        let mut stored = record("4.0.0.0\t4.7.168.255\t3356\tUS\tLEVEL3");
        let richer = AsnRecord::parse("4.0.0.0\t4.7.168.255\t3356\tUS\tLUMEN").unwrap();
        assert!(stored.refresh(&richer, MutableFieldPolicy::LastWriteWins));
        assert_eq!(stored.name.as_deref(), Some("LUMEN"));

        // Absent incoming values never erase stored ones
        let sparse = AsnRecord::parse("4.0.0.0\t4.7.168.255\t3356\tNone").unwrap();
        assert!(!stored.refresh(&sparse, MutableFieldPolicy::LastWriteWins));
        assert_eq!(stored.country_code.as_deref(), Some("US"));
        assert_eq!(stored.name.as_deref(), Some("LUMEN"));
    }

    #[test]
    fn test_first_write_wins_only_fills_gaps() {
        let mut stored = record("4.0.0.0\t4.7.168.255\t3356\tNone\tNot routed");
        let incoming = AsnRecord::parse("4.0.0.0\t4.7.168.255\t3356\tUS\tLEVEL3").unwrap();
        assert!(stored.refresh(&incoming, MutableFieldPolicy::FirstWriteWins));
        assert_eq!(stored.name.as_deref(), Some("LEVEL3"));

        let later = AsnRecord::parse("4.0.0.0\t4.7.168.255\t3356\tCA\tLUMEN").unwrap();
        assert!(!stored.refresh(&later, MutableFieldPolicy::FirstWriteWins));
        assert_eq!(stored.country_code.as_deref(), Some("US"));
    }
}
