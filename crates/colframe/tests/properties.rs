#![cfg(not(target_arch = "wasm32"))]

use colframe::{
    encode_f64, encode_i64, permute_in_place, radix_sort_u64, radix_sort_u64_sharded, AggKind,
    Column, Permutation, Table, TableOptions,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn i64_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(a.cmp(&b), encode_i64(a).cmp(&encode_i64(b)));
    }

    #[test]
    fn f64_encoding_preserves_order(
        a in proptest::num::f64::NORMAL | proptest::num::f64::ZERO | proptest::num::f64::INFINITE,
        b in proptest::num::f64::NORMAL | proptest::num::f64::ZERO | proptest::num::f64::INFINITE,
    ) {
        if a < b {
            prop_assert!(encode_f64(a) < encode_f64(b));
        } else if a > b {
            prop_assert!(encode_f64(a) > encode_f64(b));
        }
    }

    #[test]
    fn radix_sort_is_a_stable_sort(
        keys in proptest::collection::vec(0u64..64, 0..400),
        ascending in any::<bool>(),
    ) {
        let perm = radix_sort_u64(&keys, ascending);
        let mut expected: Vec<usize> = (0..keys.len()).collect();
        if ascending {
            expected.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
        } else {
            expected.sort_by(|&a, &b| keys[b].cmp(&keys[a]));
        }
        prop_assert_eq!(perm.as_slice(), &expected[..]);
    }

    #[test]
    fn sharded_radix_equals_serial(
        keys in proptest::collection::vec(any::<u64>(), 0..600),
        workers in 1usize..9,
        ascending in any::<bool>(),
    ) {
        prop_assert_eq!(
            radix_sort_u64_sharded(&keys, ascending, workers),
            radix_sort_u64(&keys, ascending)
        );
    }

    #[test]
    fn in_place_permute_matches_gather(values in proptest::collection::vec(any::<i32>(), 0..200)) {
        let keys: Vec<u64> = values.iter().map(|&v| encode_i64(v.into())).collect();
        let perm = radix_sort_u64(&keys, true);
        let gathered: Vec<i32> = perm.as_slice().iter().map(|&i| values[i]).collect();

        let mut in_place = values.clone();
        permute_in_place(&mut in_place, &perm);
        prop_assert_eq!(&in_place, &gathered);

        let mut restored = in_place;
        permute_in_place(&mut restored, &perm.inverse());
        prop_assert_eq!(restored, values);
    }

    #[test]
    fn grouping_is_independent_of_worker_count(
        rows in proptest::collection::vec(
            (
                0i64..6,
                any::<bool>(),
                -1000i64..1000,
                prop_oneof![1 => Just(f64::NAN), 4 => (-1000i32..1000).prop_map(f64::from)],
            ),
            0..300,
        ),
        workers in 2usize..9,
    ) {
        let columns = |options: TableOptions| {
            Table::with_options(
                vec![
                    Column::from_i64("k", rows.iter().map(|r| r.0).collect()),
                    Column::from_bool("b", rows.iter().map(|r| r.1).collect()),
                    Column::from_i64("v", rows.iter().map(|r| r.2).collect()),
                    Column::from_f64("f", rows.iter().map(|r| r.3).collect()),
                ],
                options,
            )
            .unwrap()
        };
        let serial = columns(TableOptions { workers: Some(1), ..TableOptions::default() });
        let sharded = columns(TableOptions {
            workers: Some(workers),
            aggregate_parallel_threshold: 0,
            ..TableOptions::default()
        });

        for kind in [AggKind::Sum, AggKind::Count, AggKind::Min] {
            prop_assert_eq!(
                sharded.group_by(&["k", "b"]).unwrap().aggregate("v", kind).unwrap(),
                serial.group_by(&["k", "b"]).unwrap().aggregate("v", kind).unwrap()
            );
        }

        // NaN never equals itself, so float results are compared by bit pattern.
        let float_bits = |table: &Table, kind: AggKind| -> Vec<u64> {
            let out = table.group_by(&["k", "b"]).unwrap().aggregate("f", kind).unwrap();
            out.column("f").unwrap().as_f64().unwrap().iter().map(|v| v.to_bits()).collect()
        };
        for kind in [AggKind::Min, AggKind::Max] {
            prop_assert_eq!(float_bits(&sharded, kind), float_bits(&serial, kind));
        }
    }
}

#[test]
fn identity_permutation_is_a_no_op() {
    let mut values = vec!["a", "b", "c"];
    permute_in_place(&mut values, &Permutation::identity(3));
    assert_eq!(values, vec!["a", "b", "c"]);
}
