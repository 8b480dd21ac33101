//! Property tests for digest determinism and binding sensitivity.

use chrono::NaiveDate;
use proptest::prelude::*;
use verix_chain::{verify_chain, HashChainer, InvoiceRecord, InvoiceType};
use verix_core::{InvoiceRef, Nif, Timestamp};

fn invoice_type() -> impl Strategy<Value = InvoiceType> {
    prop_oneof![
        Just(InvoiceType::F1),
        Just(InvoiceType::F2),
        Just(InvoiceType::F3),
        Just(InvoiceType::R1),
        Just(InvoiceType::R4),
    ]
}

fn amount() -> impl Strategy<Value = String> {
    (0u32..1_000_000, 0u32..100).prop_map(|(units, cents)| format!("{units}.{cents:02}"))
}

prop_compose! {
    fn record()(
        nif in "[A-Z][0-9]{7}[A-Z]",
        number in "[A-Z]{1,3}-[0-9]{1,6}",
        day in 1u32..=28,
        month in 1u32..=12,
        kind in invoice_type(),
        tax in amount(),
        total in amount(),
        secs in 1_700_000_000i64..1_900_000_000,
    ) -> InvoiceRecord {
        let generated = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        InvoiceRecord::new(
            Nif::new(nif).unwrap(),
            InvoiceRef::new(number).unwrap(),
            NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            kind,
            tax,
            total,
            Timestamp::from_utc(generated),
        )
        .unwrap()
    }
}

fn previous() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[0-9a-f]{0,64}".prop_map(Some)]
}

proptest! {
    #[test]
    fn digest_is_deterministic(r in record(), p in previous()) {
        let chainer = HashChainer::new();
        let a = chainer.compute_digest(&r, p.as_deref()).unwrap();
        let b = chainer.compute_digest(&r, p.as_deref()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn distinct_predecessors_give_distinct_digests(r in record(), p1 in previous(), p2 in previous()) {
        prop_assume!(p1 != p2);
        let chainer = HashChainer::new();
        prop_assert_ne!(
            chainer.compute_digest(&r, p1.as_deref()).unwrap(),
            chainer.compute_digest(&r, p2.as_deref()).unwrap()
        );
    }

    #[test]
    fn distinct_records_give_distinct_digests(r1 in record(), r2 in record(), p in previous()) {
        prop_assume!(r1 != r2);
        let chainer = HashChainer::new();
        prop_assert_ne!(
            chainer.compute_digest(&r1, p.as_deref()).unwrap(),
            chainer.compute_digest(&r2, p.as_deref()).unwrap()
        );
    }

    #[test]
    fn sequentially_built_chains_verify(records in prop::collection::vec(record(), 0..8)) {
        let chainer = HashChainer::new();
        let mut entries = Vec::new();
        let mut head: Option<String> = None;
        for r in records {
            let link = chainer.link(&r, head.as_deref()).unwrap();
            head = Some(link.content_digest.clone());
            entries.push((r, link));
        }
        prop_assert!(verify_chain(&chainer, None, &entries).is_ok());
    }
}
