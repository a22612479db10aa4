//! Integration tests for the resolution protocol against both store backends

use canonid::config::{StorageBackend, StorageConfig};
use canonid::entities::{
    Advisory, AsnRecord, CertName, CertSubject, Certificate, CertificateInput, Credential,
    DnSource, EmailAddress, EntityKind, HostName, Password, PersonName, PhoneNumber, UserName,
};
use canonid::resolve::Resolver;
use canonid::storage::{open_store, MemoryStore};
use canonid::{CanonError, FormatError};
use std::sync::Arc;
use tempfile::TempDir;

/// A resolver over each backend; the temp dir must outlive the SQLite store
fn resolvers() -> Vec<(Resolver, Option<TempDir>)> {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        ..StorageConfig::default()
    };
    let sqlite = open_store(&config, &temp_dir.path().join("canonid.db")).unwrap();

    vec![
        (Resolver::with_defaults(Arc::new(MemoryStore::new())), None),
        (Resolver::with_defaults(sqlite), Some(temp_dir)),
    ]
}

#[test]
fn test_find_or_import_is_idempotent_for_every_text_kind() {
    for (resolver, _guard) in resolvers() {
        let inputs = [
            (EntityKind::PersonName, "Dr. John Q. Public"),
            (EntityKind::PhoneNumber, "(555) 123-4567"),
            (EntityKind::UserName, "jdoe"),
            (EntityKind::HostName, "Example.COM"),
            (EntityKind::EmailAddress, "jdoe@example.com"),
            (EntityKind::Password, "hunter2"),
            (EntityKind::Credential, "admin:hunter2"),
            (EntityKind::Advisory, "CVE-2022-1234"),
            (EntityKind::CertName, "www.example.com"),
            (EntityKind::CertSubject, "/C=US/O=Example Inc/CN=www.example.com"),
            (EntityKind::CertIssuer, "CN=Example CA,O=Example Trust,C=US"),
            (EntityKind::Asn, "4.0.0.0\t4.7.168.255\t3356\tUS\tLEVEL3"),
        ];

        for (kind, text) in inputs {
            let first = resolver.resolve_text(kind, text).unwrap();
            let second = resolver.resolve_text(kind, text).unwrap();
            assert_eq!(first.id, second.id, "{kind} {text:?}");
            assert_eq!(first.record, second.record);
            assert_eq!(resolver.store().count(kind).unwrap(), 1, "{kind}");
        }
    }
}

#[test]
fn test_duplicate_subject_import_conflicts() {
    for (resolver, _guard) in resolvers() {
        let dn = DnSource::from("/C=US/ST=CA/L=Springfield/O=Example Inc/OU=Ops/CN=www.example.com");
        let first = resolver.import::<CertSubject>(&dn).unwrap();

        let err = resolver.import::<CertSubject>(&dn).unwrap_err();
        assert!(matches!(
            err,
            CanonError::DuplicateKeyConflict {
                kind: EntityKind::CertSubject,
                ..
            }
        ));
        assert_eq!(resolver.store().count(EntityKind::CertSubject).unwrap(), 1);

        // The same subject written as RDN pairs resolves to the same record
        let rdns = DnSource::Rdns(vec![
            ("CN".to_string(), "www.example.com".to_string()),
            ("OU".to_string(), "Ops".to_string()),
            ("O".to_string(), "Example Inc".to_string()),
            ("L".to_string(), "Springfield".to_string()),
            ("ST".to_string(), "CA".to_string()),
            ("C".to_string(), "US".to_string()),
        ]);
        let found = resolver.lookup::<CertSubject>(&rdns).unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }
}

#[test]
fn test_lookup_never_creates() {
    for (resolver, _guard) in resolvers() {
        assert!(resolver
            .lookup::<PersonName>("Jane Doe")
            .unwrap()
            .is_none());
        assert!(resolver
            .lookup::<EmailAddress>("jane@example.org")
            .unwrap()
            .is_none());

        for kind in EntityKind::ALL {
            assert_eq!(resolver.store().count(kind).unwrap(), 0);
        }
    }
}

#[test]
fn test_rejected_input_persists_nothing() {
    for (resolver, _guard) in resolvers() {
        assert!(matches!(
            resolver.find_or_import::<PersonName>("not_a_name"),
            Err(CanonError::Format(FormatError::InvalidPersonName(_)))
        ));
        assert!(matches!(
            resolver.find_or_import::<Credential>("foo"),
            Err(CanonError::Format(FormatError::InvalidCredential(_)))
        ));
        assert!(matches!(
            resolver.asn_containing("0"),
            Err(CanonError::Format(FormatError::InvalidIpAddress(_)))
        ));

        // Subject without a country fails validation before its CN is stored
        assert!(matches!(
            resolver.find_or_import::<CertSubject>(&DnSource::from("/O=Example Inc/CN=example.com")),
            Err(CanonError::MissingRequiredField { field: "country", .. })
        ));

        for kind in EntityKind::ALL {
            assert_eq!(resolver.store().count(kind).unwrap(), 0, "{kind}");
        }
    }
}

#[test]
fn test_email_whitespace_is_rejected_not_trimmed() {
    for (resolver, _guard) in resolvers() {
        assert!(matches!(
            resolver.find_or_import::<EmailAddress>(" admin@example.com\n"),
            Err(CanonError::Format(FormatError::ContainsWhitespace(_)))
        ));
        assert!(matches!(
            resolver.lookup::<EmailAddress>("admin@example.com "),
            Err(CanonError::Format(FormatError::ContainsWhitespace(_)))
        ));
        assert!(matches!(
            resolver.find_or_import::<UserName>(" admin"),
            Err(CanonError::Format(FormatError::ContainsWhitespace(_)))
        ));
        assert!(matches!(
            resolver.find_or_import::<HostName>("example.com\t"),
            Err(CanonError::Format(FormatError::ContainsWhitespace(_)))
        ));

        for kind in [EntityKind::EmailAddress, EntityKind::UserName, EntityKind::HostName] {
            assert_eq!(resolver.store().count(kind).unwrap(), 0, "{kind}");
        }
    }
}

#[test]
fn test_email_and_credential_share_user_names() {
    for (resolver, _guard) in resolvers() {
        let email = resolver.find_or_import::<EmailAddress>("admin@Example.com").unwrap();
        let other = resolver.find_or_import::<EmailAddress>("admin@corp.example.net").unwrap();
        let credential = resolver.find_or_import::<Credential>("admin:hunter2").unwrap();

        assert_eq!(email.record.address, "admin@example.com");
        assert_eq!(email.record.user_name_id, other.record.user_name_id);
        assert_eq!(email.record.user_name_id, credential.record.user_name_id);
        assert_ne!(email.record.host_name_id, other.record.host_name_id);

        assert_eq!(resolver.store().count(EntityKind::UserName).unwrap(), 1);
        assert_eq!(resolver.store().count(EntityKind::HostName).unwrap(), 2);

        let user = resolver.lookup::<UserName>("admin").unwrap().unwrap();
        assert_eq!(user.id, credential.record.user_name_id);
        let host = resolver.lookup::<HostName>("example.com").unwrap().unwrap();
        assert_eq!(host.id, email.record.host_name_id);
        let password = resolver.lookup::<Password>("hunter2").unwrap().unwrap();
        assert_eq!(password.id, credential.record.password_id);
    }
}

#[test]
fn test_phone_delimiter_families_share_a_record() {
    for (resolver, _guard) in resolvers() {
        let local = resolver.find_or_import::<PhoneNumber>("555-123-4567").unwrap();
        for text in ["555.123.4567", "555 123 4567", "(555) 123-4567", " (555)123.4567 "] {
            let found = resolver.find_or_import::<PhoneNumber>(text).unwrap();
            assert_eq!(found.id, local.id, "{text:?}");
        }

        let full = resolver.find_or_import::<PhoneNumber>("+1 (555) 123-4567").unwrap();
        for text in ["+1-555-123-4567", "+1.555.123.4567", "+1 555 123 4567"] {
            let found = resolver.find_or_import::<PhoneNumber>(text).unwrap();
            assert_eq!(found.id, full.id, "{text:?}");
        }
        assert_ne!(local.id, full.id);
        assert_eq!(resolver.store().count(EntityKind::PhoneNumber).unwrap(), 2);
    }
}

#[test]
fn test_advisory_round_trip() {
    for (resolver, _guard) in resolvers() {
        for text in ["CVE-2021-44228", "MS17-010", "RHSA-2022:6187", "GHSA-3hhc-qp5v-9p2j"] {
            let created = resolver.find_or_import::<Advisory>(text).unwrap();
            assert_eq!(created.record.full_id, text);
            assert_eq!(created.record.canonical_id(), text);

            let fetched = resolver.fetch::<Advisory>(created.id).unwrap();
            assert_eq!(fetched, created);
        }
        assert_eq!(resolver.store().count(EntityKind::Advisory).unwrap(), 4);
    }
}

#[test]
fn test_certificate_import_resolves_sub_records() {
    for (resolver, _guard) in resolvers() {
        let input = CertificateInput {
            fingerprint: "AB:CD:EF:01".to_string(),
            serial: "0x1f".to_string(),
            subject: DnSource::from("/C=US/O=Example Inc/CN=www.example.com"),
            issuer: Some(DnSource::from("/C=US/O=Example Inc/CN=www.example.com")),
            subject_alt_names: Some(
                "DNS:www.example.com, DNS:Example.com, IP Address:192.0.2.1".to_string(),
            ),
            not_before: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            not_after: Some("2025-01-01T00:00:00Z".parse().unwrap()),
        };

        let certificate = resolver.find_or_import::<Certificate>(&input).unwrap();
        assert_eq!(certificate.record.fingerprint, "abcdef01");
        assert_eq!(certificate.record.issuer_id, None);
        assert_eq!(certificate.record.alt_name_ids.len(), 3);

        // The subject's CN and the first SAN are one CertName
        let subject = resolver
            .fetch::<CertSubject>(certificate.record.subject_id)
            .unwrap();
        let cn = resolver.lookup::<CertName>("www.example.com").unwrap().unwrap();
        assert_eq!(subject.record.common_name_id, Some(cn.id));
        assert!(certificate.record.alt_name_ids.contains(&cn.id));
        assert!(resolver.lookup::<CertName>("example.com").unwrap().is_some());
        assert!(resolver.lookup::<CertName>("192.0.2.1").unwrap().is_some());
        assert_eq!(resolver.store().count(EntityKind::CertName).unwrap(), 3);
        assert_eq!(resolver.store().count(EntityKind::CertIssuer).unwrap(), 0);

        let again = resolver.find_or_import::<Certificate>(&input).unwrap();
        assert_eq!(again.id, certificate.id);
        assert_eq!(resolver.store().count(EntityKind::Certificate).unwrap(), 1);
    }
}

#[test]
fn test_asn_containment() {
    for (resolver, _guard) in resolvers() {
        let level3 = resolver
            .find_or_import::<AsnRecord>("4.0.0.0\t4.7.168.255\t3356\tUS\tLEVEL3")
            .unwrap();
        let nested = resolver
            .find_or_import::<AsnRecord>("4.4.0.0\t4.4.255.255\t64500\tUS\tNESTED")
            .unwrap();
        resolver
            .find_or_import::<AsnRecord>("2001:db8::\t2001:db8::ffff\t64496\tZZ\tDOCS")
            .unwrap();
        let translated = resolver
            .find_or_import::<AsnRecord>("64:ff9b::1:0:0\t100::ffff:ffff:ffff:ffff\t0\tNone")
            .unwrap();

        let hits: Vec<_> = resolver
            .asn_containing("4.4.4.4")
            .unwrap()
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(hits, vec![level3.id, nested.id]);
        assert!(!hits.contains(&translated.id));

        let hits: Vec<_> = resolver
            .asn_containing("4.4.1.1")
            .unwrap()
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(hits, vec![level3.id, nested.id]);

        let hits = resolver.asn_containing("4.0.0.0").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.number, 3356);

        // Version mismatch is never a hit
        assert!(resolver.asn_containing("::4.4.1.1").unwrap().is_empty());
        assert_eq!(resolver.asn_containing("2001:db8::1").unwrap().len(), 1);
        assert!(resolver.asn_containing("8.8.8.8").unwrap().is_empty());
    }
}

#[test]
fn test_asn_refresh_merges_descriptive_fields() {
    for (resolver, _guard) in resolvers() {
        let created = resolver
            .import_or_refresh::<AsnRecord>("4.0.0.0\t4.7.168.255\t3356\tNone\tNot routed")
            .unwrap();
        assert_eq!(created.record.name, None);

        let refreshed = resolver
            .import_or_refresh::<AsnRecord>("4.0.0.0\t4.7.168.255\t3356\tUS\tLEVEL3")
            .unwrap();
        assert_eq!(refreshed.id, created.id);
        assert_eq!(refreshed.record.name.as_deref(), Some("LEVEL3"));

        // An absent name never erases the stored one
        resolver
            .import_or_refresh::<AsnRecord>("4.0.0.0\t4.7.168.255\t3356\tUS")
            .unwrap();
        let stored = resolver.fetch::<AsnRecord>(created.id).unwrap();
        assert_eq!(stored.record.name.as_deref(), Some("LEVEL3"));
        assert_eq!(stored.record.country_code.as_deref(), Some("US"));
        assert_eq!(resolver.store().count(EntityKind::Asn).unwrap(), 1);
    }
}
