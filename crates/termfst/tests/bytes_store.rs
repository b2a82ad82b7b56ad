//! Randomized byte store operations checked against a flat reference buffer.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use termfst::{BytesReader, BytesStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_bytes(rng: &mut SmallRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.r#gen::<u8>()).collect()
}

fn verify(store: &BytesStore, expected: &[u8], rng: &mut SmallRng) {
    assert_eq!(store.position(), expected.len() as i64);
    assert_eq!(store.to_vec(), expected);
    if expected.is_empty() {
        return;
    }

    let mut forward = store.forward_reader();
    forward.set_position(0);
    for (pos, &b) in expected.iter().enumerate() {
        assert_eq!(forward.read_byte().unwrap(), b, "forward read at {pos}");
    }

    let mut reverse = store.reverse_reader();
    reverse.set_position(expected.len() as i64 - 1);
    for pos in (0..expected.len()).rev() {
        assert_eq!(reverse.read_byte().unwrap(), expected[pos], "reverse read at {pos}");
    }
    assert_eq!(reverse.position(), -1);

    // random seeks, including multi-byte reads that cross blocks
    for _ in 0..20 {
        let pos = rng.gen_range(0..expected.len());
        let len = rng.gen_range(0..=(expected.len() - pos).min(300));
        let mut buf = vec![0u8; len];
        forward.set_position(pos as i64);
        forward.read_bytes(&mut buf).unwrap();
        assert_eq!(buf, &expected[pos..pos + len]);

        reverse.set_position(pos as i64);
        assert_eq!(reverse.read_byte().unwrap(), expected[pos]);
    }
}

fn run_random_ops(seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let block_bits = rng.gen_range(8..=15);
    let max_bytes = rng.gen_range(1..=20_000);
    let mut store = BytesStore::new(block_bits);
    let mut expected: Vec<u8> = Vec::new();

    while expected.len() < max_bytes {
        let len = expected.len();
        match rng.gen_range(0..8) {
            0 => {
                let b = rng.r#gen::<u8>();
                store.write_byte(b);
                expected.push(b);
            }
            1 => {
                let count = rng.gen_range(0..=500);
                let bytes = random_bytes(&mut rng, count);
                store.write_bytes(&bytes);
                expected.extend_from_slice(&bytes);
            }
            2 if len > 0 => {
                let dest = rng.gen_range(0..len);
                let count = rng.gen_range(0..=len - dest);
                let bytes = random_bytes(&mut rng, count);
                store.write_bytes_at(dest as i64, &bytes);
                expected[dest..dest + bytes.len()].copy_from_slice(&bytes);
            }
            3 if len > 1 => {
                let from = rng.gen_range(0..len - 1);
                let to = rng.gen_range(from + 1..len);
                store.reverse(from as i64, to as i64);
                expected[from..=to].reverse();
            }
            4 if len > 1 => {
                let src = rng.gen_range(0..len - 1);
                let dest = rng.gen_range(src + 1..len);
                let count = rng.gen_range(0..=len - dest);
                store.copy_bytes(src as i64, dest as i64, count);
                expected.copy_within(src..src + count, dest);
            }
            5 => {
                let count = rng.gen_range(0..=300);
                store.skip_bytes(count);
                expected.resize(len + count, 0);
            }
            6 if len >= 4 => {
                let dest = rng.gen_range(0..=len - 4);
                let value = rng.r#gen::<i32>();
                store.write_int_at(dest as i64, value);
                expected[dest..dest + 4].copy_from_slice(&value.to_be_bytes());
            }
            7 if len > 0 && rng.gen_bool(0.2) => {
                let new_len = rng.gen_range(0..len);
                store.truncate(new_len as i64);
                expected.truncate(new_len);
            }
            _ => {}
        }

        if rng.gen_ratio(1, 20) {
            verify(&store, &expected, &mut rng);
        }
    }

    verify(&store, &expected, &mut rng);
    store.finish();
    verify(&store, &expected, &mut rng);

    let mut written = Vec::new();
    store.write_to(&mut written).unwrap();
    assert_eq!(written, expected);

    let reloaded = BytesStore::from_bytes(&expected, block_bits);
    verify(&reloaded, &expected, &mut rng);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn random_operations_match_reference() {
    for seed in 0..40 {
        run_random_ops(seed);
    }
}

#[test]
fn reverse_is_an_involution() {
    let mut rng = SmallRng::seed_from_u64(7);
    for block_bits in [1, 3, 8] {
        let mut store = BytesStore::new(block_bits);
        let data = random_bytes(&mut rng, 1000);
        store.write_bytes(&data);
        for _ in 0..50 {
            let from = rng.gen_range(0..999);
            let to = rng.gen_range(from + 1..1000);
            store.reverse(from, to);
            store.reverse(from, to);
            assert_eq!(store.to_vec(), data);
        }
    }
}

#[test]
fn copy_within_one_block_and_across_blocks() {
    let mut store = BytesStore::new(4);
    let data: Vec<u8> = (0..64).collect();
    store.write_bytes(&data);

    // overlapping, same block
    store.copy_bytes(1, 3, 10);
    let mut expected = data.clone();
    expected.copy_within(1..11, 3);
    assert_eq!(store.to_vec(), expected);

    // overlapping, crossing several blocks
    store.copy_bytes(5, 20, 40);
    expected.copy_within(5..45, 20);
    assert_eq!(store.to_vec(), expected);
}
