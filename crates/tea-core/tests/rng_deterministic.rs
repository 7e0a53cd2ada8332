use rand::RngCore;
use tea_core::{derive_substream_seed, RngHandle};

#[test]
fn same_seed_reproduces_the_stream() {
    let mut a = RngHandle::from_seed(2024);
    let mut b = RngHandle::from_seed(2024);
    for _ in 0..16 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
}

#[test]
fn substreams_differ_from_master_and_each_other() {
    let master = 7u64;
    let s1 = derive_substream_seed(master, 1);
    let s2 = derive_substream_seed(master, 2);
    assert_ne!(s1, s2);
    assert_ne!(s1, master);
    // The derivation rule is fixed; a handle built via `substream` matches
    // one seeded manually with the derived value.
    let mut via_helper = RngHandle::substream(master, 1);
    let mut manual = RngHandle::from_seed(s1);
    assert_eq!(via_helper.next_u64(), manual.next_u64());
}

#[test]
fn uniform_in_respects_bounds() {
    let mut rng = RngHandle::from_seed(99);
    for _ in 0..256 {
        let v = rng.uniform_in(-2.5, 4.0);
        assert!((-2.5..4.0).contains(&v));
    }
    assert_eq!(rng.uniform_in(3.0, 3.0), 3.0);
}
