//! Property tests for wire encoding, amounts, addresses and fee arithmetic

use proptest::prelude::*;
use std::sync::Arc;
use ton_transfer::cell::{decode_boc, encode_boc, Address, CellBuilder};
use ton_transfer::tx_builder::simulate::apply_margin;
use ton_transfer::tx_builder::{InstructionBuilder, MaxAmountEstimate};
use ton_transfer::units::{from_nano, to_nano};

proptest! {
    #[test]
    fn boc_encoding_is_canonical(payload in proptest::collection::vec(any::<u8>(), 0..100), child in proptest::collection::vec(any::<u8>(), 0..60)) {
        let mut leaf = CellBuilder::new();
        leaf.store_slice(&child).unwrap();
        let leaf = Arc::new(leaf.build().unwrap());

        let mut root = CellBuilder::new();
        root.store_slice(&payload).unwrap().store_reference(&leaf).unwrap();
        let root = Arc::new(root.build().unwrap());

        let bytes = encode_boc(&root).unwrap();
        let decoded = decode_boc(&bytes).unwrap();
        prop_assert_eq!(decoded.cell_hash(), root.cell_hash());
        prop_assert_eq!(encode_boc(&decoded).unwrap(), bytes);
    }

    #[test]
    fn oversized_boc_headers_are_rejected(cells in 0x0100_0000u32.., tail in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = vec![0xb5, 0xee, 0x9c, 0x72, 0x04, 0x01];
        bytes.extend_from_slice(&cells.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.push(2);
        bytes.extend_from_slice(&tail);
        prop_assert!(decode_boc(&bytes).is_err());
    }

    #[test]
    fn nano_text_roundtrip(amount in 0u64..=u64::MAX / 2) {
        prop_assert_eq!(to_nano(&from_nano(amount)).unwrap(), amount);
    }

    #[test]
    fn friendly_address_roundtrip(wc in prop_oneof![Just(0i8), Just(-1i8)], hash in any::<[u8; 32]>(), bounceable: bool, testnet: bool) {
        let addr = Address::new(wc, hash);
        let (parsed, flags) = Address::parse_friendly(&addr.to_friendly(bounceable, testnet)).unwrap();
        prop_assert_eq!(parsed, addr);
        prop_assert_eq!(flags.bounceable, bounceable);
        prop_assert_eq!(flags.test_only, testnet);
    }

    #[test]
    fn margin_never_undercharges(fee in 0u64..=1_000_000_000_000, margin in 0u64..=100) {
        let with_margin = apply_margin(fee, margin);
        prop_assert!(with_margin as u128 * 100 >= fee as u128 * (100 + margin as u128));
        prop_assert!((with_margin as u128 * 100) < fee as u128 * (100 + margin as u128) + 100);
    }

    #[test]
    fn max_estimate_accounts_for_whole_balance(balance in 0u64..=1_000_000_000_000_000, fee in 0u64..=1_000_000_000, pct in 0.0f64..=1.0) {
        match MaxAmountEstimate::compute(balance, fee, pct) {
            Some(est) => {
                prop_assert_eq!(est.max_amount + est.total_fee, balance);
                prop_assert!(est.max_admin_fee <= balance - fee);
            }
            None => prop_assert!(fee > balance),
        }
    }

    #[test]
    fn jetton_forward_value_respects_floor(fee in proptest::option::of(0u64..=10_000_000_000), floor in 1u64..=1_000_000_000) {
        let builder = InstructionBuilder::new(floor, 1_000_000_000);
        let forward = builder.jetton_forward_value(fee, None);
        match fee {
            Some(_) => prop_assert!(forward >= floor),
            None => prop_assert_eq!(forward, 1_000_000_000),
        }
        prop_assert!(builder.swap_forward_value(fee.unwrap_or(0), None) >= floor);
    }
}
