//! End-to-end construction tests: build, read back, save and reload.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use termfst::util::{to_code_points, to_ints};
use termfst::{
    Builder, BuilderConfig, ByteSequenceOutputs, Fst, FstError, InputType, ListOfOutputs,
    NoOutput, NoOutputs, Outputs, PositiveIntOutputs,
};
use termfst_core::BytesRef;
use termfst_core::unicode::utf32_to_utf8;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Random sorted, de-duplicated keys. A small alphabet keeps prefixes and
/// suffixes shared; `wide` mixes in labels beyond one byte.
fn random_keys(seed: u64, count: usize, input_type: InputType) -> Vec<Vec<i32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut keys = std::collections::BTreeSet::new();
    while keys.len() < count {
        let len = rng.gen_range(1..=10);
        let key: Vec<i32> = (0..len)
            .map(|_| match input_type {
                InputType::Byte1 => rng.gen_range(b'a' as i32..=b'z' as i32),
                InputType::Byte2 if rng.gen_bool(0.2) => rng.gen_range(0x100..=0xFFFF),
                InputType::Byte4 if rng.gen_bool(0.2) => rng.gen_range(0x1_0000..=0x10_FFFF),
                _ => rng.gen_range(b'a' as i32..=b'h' as i32),
            })
            .collect();
        keys.insert(key);
    }
    keys.into_iter().collect()
}

fn build<O: Outputs>(
    config: BuilderConfig,
    outputs: O,
    entries: &[(Vec<i32>, O::Value)],
) -> (Fst<O>, Builder<O>) {
    let mut builder = Builder::with_config(config, outputs).unwrap();
    for (key, value) in entries {
        builder.add(key, value.clone()).unwrap();
    }
    let fst = builder.finish().unwrap();
    (fst, builder)
}

fn saved<O: Outputs>(fst: &Fst<O>) -> Vec<u8> {
    let mut out = Vec::new();
    fst.save(&mut out).unwrap();
    out
}

fn assert_answers<O: Outputs>(fst: &Fst<O>, entries: &[(Vec<i32>, O::Value)]) {
    for (key, value) in entries {
        assert_eq!(fst.get(key).unwrap().as_ref(), Some(value), "key {key:?}");
    }
    assert_eq!(fst.entries().unwrap(), entries);
}

// ---------------------------------------------------------------------------
// Output types x input types
// ---------------------------------------------------------------------------

#[test]
fn int_outputs_for_every_input_type() {
    for (seed, input_type) in [(1, InputType::Byte1), (2, InputType::Byte2), (3, InputType::Byte4)] {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut next = 0u64;
        let entries: Vec<(Vec<i32>, u64)> = random_keys(seed, 2_000, input_type)
            .into_iter()
            .map(|key| {
                next += rng.gen_range(0..50);
                (key, next)
            })
            .collect();

        let (fst, builder) = build(BuilderConfig::new(input_type), PositiveIntOutputs::new(), &entries);
        assert_eq!(fst.input_type(), input_type);
        assert_eq!(builder.term_count(), 2_000);
        assert_answers(&fst, &entries);

        // absent keys: every stored key extended by one label
        for (key, _) in entries.iter().take(200) {
            let mut longer = key.clone();
            longer.push(0);
            assert_eq!(fst.get(&longer).unwrap(), None);
        }
    }
}

#[test]
fn byte_sequence_outputs() {
    let keys = random_keys(11, 1_000, InputType::Byte1);
    let entries: Vec<(Vec<i32>, BytesRef)> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let text = format!("{}-{}", i % 7, key.len());
            (key.clone(), BytesRef::from(text.as_str()))
        })
        .collect();
    let (fst, _) = build(BuilderConfig::default(), ByteSequenceOutputs::new(), &entries);
    assert_answers(&fst, &entries);
}

#[test]
fn no_outputs_set_membership() {
    let keys = random_keys(12, 1_500, InputType::Byte2);
    let entries: Vec<(Vec<i32>, NoOutput)> = keys.into_iter().map(|k| (k, NoOutput)).collect();
    let (fst, _) = build(BuilderConfig::new(InputType::Byte2), NoOutputs::new(), &entries);
    assert_answers(&fst, &entries);
}

#[test]
fn list_outputs_collect_duplicates() {
    let outputs = ListOfOutputs::new(PositiveIntOutputs::new());
    let mut builder = Builder::new(InputType::Byte1, outputs.clone());
    let words: [(&[u8], u64); 6] = [
        (b"run", 3),
        (b"run", 1),
        (b"run", 8),
        (b"runner", 2),
        (b"running", 9),
        (b"running", 4),
    ];
    for (word, value) in words {
        builder.add(&to_ints(word), vec![value]).unwrap();
    }
    let fst = builder.finish().unwrap();
    assert_eq!(fst.get(&to_ints(b"run")).unwrap(), Some(vec![3, 1, 8]));
    assert_eq!(fst.get(&to_ints(b"runner")).unwrap(), Some(vec![2]));
    assert_eq!(fst.get(&to_ints(b"running")).unwrap(), Some(vec![9, 4]));

    let loaded = Fst::from_bytes(&saved(&fst), outputs).unwrap();
    assert_eq!(loaded.get(&to_ints(b"run")).unwrap(), Some(vec![3, 1, 8]));
}

#[test]
fn code_point_inputs() {
    let words = ["kissa", "koira", "käärme", "köysi", "örkki"];
    let mut builder = Builder::new(InputType::Byte4, PositiveIntOutputs::new());
    for (i, word) in words.iter().enumerate() {
        builder.add(&to_code_points(word), i as u64).unwrap();
    }
    let fst = builder.finish().unwrap();
    for (i, word) in words.iter().enumerate() {
        assert_eq!(fst.get(&to_code_points(word)).unwrap(), Some(i as u64));
    }
    assert_eq!(fst.get(&to_code_points("kaarme")).unwrap(), None);

    let decoded: Vec<String> = fst
        .entries()
        .unwrap()
        .into_iter()
        .map(|(labels, _)| String::from_utf8(utf32_to_utf8(&labels).unwrap()).unwrap())
        .collect();
    assert_eq!(decoded, words);
}

// ---------------------------------------------------------------------------
// Node layouts and configuration
// ---------------------------------------------------------------------------

#[test]
fn every_layout_reads_back_the_same() {
    let mut rng = SmallRng::seed_from_u64(21);
    let entries: Vec<(Vec<i32>, u64)> = random_keys(21, 3_000, InputType::Byte1)
        .into_iter()
        .map(|key| (key, rng.gen_range(0..1_000)))
        .collect();

    let default = BuilderConfig::default();
    let (fst, builder) = build(default.clone(), PositiveIntOutputs::new(), &entries);
    assert!(builder.binary_search_node_count() + builder.direct_addressing_node_count() > 0);
    assert!(builder.direct_addressing_node_count() > 0);
    assert_answers(&fst, &entries);

    let lists_only = default.clone().with_fixed_length_arcs(false);
    let (fst, builder) = build(lists_only, PositiveIntOutputs::new(), &entries);
    assert_eq!(builder.binary_search_node_count(), 0);
    assert_eq!(builder.direct_addressing_node_count(), 0);
    assert_answers(&fst, &entries);

    let binary_search_only = default.clone().with_direct_addressing_factor(-1.0);
    let (fst, builder) = build(binary_search_only, PositiveIntOutputs::new(), &entries);
    assert!(builder.binary_search_node_count() > 0);
    assert_eq!(builder.direct_addressing_node_count(), 0);
    assert_answers(&fst, &entries);

    let generous = default.with_direct_addressing_factor(4.0);
    let (fst, _) = build(generous, PositiveIntOutputs::new(), &entries);
    assert_answers(&fst, &entries);
}

#[test]
fn sharing_shrinks_the_fst() {
    let entries: Vec<(Vec<i32>, NoOutput)> = random_keys(31, 2_000, InputType::Byte1)
        .into_iter()
        .map(|k| (k, NoOutput))
        .collect();

    let (shared, shared_builder) = build(BuilderConfig::default(), NoOutputs::new(), &entries);
    let unshared_config = BuilderConfig::default().with_share_suffix(false);
    let (unshared, unshared_builder) = build(unshared_config, NoOutputs::new(), &entries);

    assert!(shared_builder.node_count() < unshared_builder.node_count());
    assert!(shared.size_in_bytes() < unshared.size_in_bytes());
    assert_answers(&unshared, &entries);

    let singletons_only = BuilderConfig::default().with_share_non_singleton_nodes(false);
    let (fst, builder) = build(singletons_only, NoOutputs::new(), &entries);
    assert!(builder.node_count() >= shared_builder.node_count());
    assert_answers(&fst, &entries);

    let short_tails = BuilderConfig::default().with_share_max_tail_length(2);
    let (fst, _) = build(short_tails, NoOutputs::new(), &entries);
    assert_answers(&fst, &entries);
}

#[test]
fn small_pages_span_many_blocks() {
    let mut rng = SmallRng::seed_from_u64(41);
    let entries: Vec<(Vec<i32>, u64)> = random_keys(41, 1_000, InputType::Byte1)
        .into_iter()
        .map(|key| (key, rng.gen_range(0..100_000)))
        .collect();
    let config = BuilderConfig::default().with_bytes_page_bits(6);
    let (fst, _) = build(config, PositiveIntOutputs::new(), &entries);
    assert!(fst.size_in_bytes() > 64 * 4);
    assert_answers(&fst, &entries);

    // identical bytes regardless of page size
    let (reference, _) = build(BuilderConfig::default(), PositiveIntOutputs::new(), &entries);
    assert_eq!(saved(&fst), saved(&reference));
}

// ---------------------------------------------------------------------------
// Determinism and persistence
// ---------------------------------------------------------------------------

#[test]
fn builds_are_deterministic() {
    let mut rng = SmallRng::seed_from_u64(51);
    let entries: Vec<(Vec<i32>, u64)> = random_keys(51, 2_500, InputType::Byte2)
        .into_iter()
        .map(|key| (key, rng.gen_range(0..10)))
        .collect();
    let config = BuilderConfig::new(InputType::Byte2);
    let (first, _) = build(config.clone(), PositiveIntOutputs::new(), &entries);
    let (second, _) = build(config, PositiveIntOutputs::new(), &entries);
    assert_eq!(saved(&first), saved(&second));
}

#[test]
fn save_and_reload() {
    let mut rng = SmallRng::seed_from_u64(61);
    let mut entries: Vec<(Vec<i32>, u64)> = vec![(Vec::new(), 77)];
    entries.extend(
        random_keys(61, 1_000, InputType::Byte4)
            .into_iter()
            .map(|key| (key, rng.gen_range(0..1 << 40))),
    );
    let (fst, _) = build(BuilderConfig::new(InputType::Byte4), PositiveIntOutputs::new(), &entries);
    let bytes = saved(&fst);

    let loaded = Fst::from_bytes(&bytes, PositiveIntOutputs::new()).unwrap();
    assert_eq!(loaded.input_type(), InputType::Byte4);
    assert_eq!(loaded.empty_output(), Some(&77));
    assert_answers(&loaded, &entries);
    assert_eq!(saved(&loaded), bytes);
}

// ---------------------------------------------------------------------------
// Structure of small inputs
// ---------------------------------------------------------------------------

#[test]
fn equal_outputs_hoist_onto_the_shared_arc() {
    let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs::new());
    builder.add(&to_ints(b"ab"), 5).unwrap();
    builder.add(&to_ints(b"ac"), 5).unwrap();
    let fst = builder.finish().unwrap();

    let mut input = fst.bytes_reader();
    let a = fst
        .find_target_arc(b'a' as i32, &fst.first_arc(), input.as_mut())
        .unwrap()
        .unwrap();
    assert_eq!(a.output, 5);
    for label in [b'b', b'c'] {
        let arc = fst
            .find_target_arc(label as i32, &a, input.as_mut())
            .unwrap()
            .unwrap();
        assert_eq!(arc.output, 0);
        assert!(arc.is_final());
    }
}

#[test]
fn final_node_with_outgoing_arcs() {
    let mut builder = Builder::new(InputType::Byte1, NoOutputs::new());
    for word in [&b"stat"[..], b"station", b"stop"] {
        builder.add(&to_ints(word), NoOutput).unwrap();
    }
    let fst = builder.finish().unwrap();
    assert!(fst.start_node() > 0);

    let mut input = fst.bytes_reader();
    let mut arc = fst.first_arc();
    for &label in b"stat" {
        arc = fst
            .find_target_arc(label as i32, &arc, input.as_mut())
            .unwrap()
            .unwrap();
    }
    // "stat" is accepted and still continues toward "station"
    assert!(arc.is_final());
    assert!(arc.target_has_arcs());

    let end = fst.read_first_target_arc(&arc, input.as_mut()).unwrap();
    assert_eq!(end.label, termfst::fst::END_LABEL);
    let mut next = end;
    fst.read_next_arc(&mut next, input.as_mut()).unwrap();
    assert_eq!(next.label, b'i' as i32);
    assert!(next.is_last());

    let words: Vec<Vec<i32>> = fst.entries().unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(words, vec![to_ints(b"stat"), to_ints(b"station"), to_ints(b"stop")]);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Integer outputs with no byte encoding.
#[derive(Debug, Clone)]
struct UnencodedOutputs;

impl Outputs for UnencodedOutputs {
    type Value = u32;

    fn name(&self) -> &'static str {
        "UnencodedOutputs"
    }

    fn no_output(&self) -> u32 {
        0
    }

    fn common(&self, a: &u32, b: &u32) -> u32 {
        *a.min(b)
    }

    fn subtract(&self, output: &u32, inc: &u32) -> u32 {
        output - inc
    }

    fn add(&self, prefix: &u32, output: &u32) -> u32 {
        prefix + output
    }
}

#[test]
fn unencodable_outputs_fail_explicitly() {
    let mut builder = Builder::new(InputType::Byte1, UnencodedOutputs);
    builder.add(&to_ints(b"a"), 3).unwrap();
    builder.add(&to_ints(b"b"), 4).unwrap();
    let err = builder.finish().unwrap_err();
    assert!(matches!(
        err,
        FstError::UnsupportedOutputEncoding("UnencodedOutputs")
    ));
}

#[test]
fn unencodable_outputs_are_fine_when_never_written() {
    let mut builder = Builder::new(InputType::Byte1, UnencodedOutputs);
    builder.add(&to_ints(b"a"), 0).unwrap();
    builder.add(&to_ints(b"b"), 0).unwrap();
    let fst = builder.finish().unwrap();
    assert_eq!(fst.get(&to_ints(b"b")).unwrap(), Some(0));
}

#[test]
fn invalid_config_is_rejected() {
    let config = BuilderConfig::default().with_direct_addressing_factor(f32::INFINITY);
    let err = Builder::with_config(config, NoOutputs::new()).unwrap_err();
    assert!(err.to_string().contains("direct_addressing_max_oversizing_factor"));
}

#[test]
fn corrupt_containers_are_rejected() {
    let mut builder = Builder::new(InputType::Byte1, NoOutputs::new());
    builder.add(&to_ints(b"word"), NoOutput).unwrap();
    let bytes = saved(&builder.finish().unwrap());

    let mut bad_magic = bytes.clone();
    bad_magic[5] ^= 0xFF;
    assert!(matches!(
        Fst::from_bytes(&bad_magic, NoOutputs::new()),
        Err(FstError::InvalidMagic)
    ));

    let mut bad_type = bytes.clone();
    bad_type[9] = 9;
    assert!(matches!(
        Fst::from_bytes(&bad_type, NoOutputs::new()),
        Err(FstError::InvalidInputType(9))
    ));

    assert!(matches!(
        Fst::from_bytes(&bytes[..bytes.len() - 1], NoOutputs::new()),
        Err(FstError::TooShort { .. })
    ));

    // intact container, damaged node bytes: loads, then lookups fail cleanly
    let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs::new());
    builder.add(&to_ints(b"abc"), 3).unwrap();
    builder.add(&to_ints(b"abd"), 5).unwrap();
    let mut damaged = saved(&builder.finish().unwrap());
    for byte in &mut damaged[19..] {
        *byte = 0xFF;
    }
    let fst = Fst::from_bytes(&damaged, PositiveIntOutputs::new()).unwrap();
    assert!(matches!(fst.get(&to_ints(b"abc")), Err(FstError::Corrupt(_))));
}

#[test]
fn damaged_node_bytes_never_panic() {
    let entries: Vec<(Vec<i32>, BytesRef)> = random_keys(71, 120, InputType::Byte1)
        .into_iter()
        .enumerate()
        .map(|(i, key)| (key, BytesRef::from(format!("v{}", i % 7).as_str())))
        .collect();
    let (fst, _) = build(BuilderConfig::default(), ByteSequenceOutputs::new(), &entries);
    let bytes = saved(&fst);
    let body_start = bytes.len() - fst.size_in_bytes() as usize;

    let mut failures = 0;
    for pos in body_start..bytes.len() {
        for value in [0x00, 0xFF, bytes[pos] ^ 0x55] {
            let mut damaged = bytes.clone();
            damaged[pos] = value;
            let Ok(fst) = Fst::from_bytes(&damaged, ByteSequenceOutputs::new()) else {
                continue;
            };
            let lookups = entries.iter().map(|(key, _)| fst.get(key).map(|_| ()));
            let results: Vec<Result<(), FstError>> =
                lookups.chain(std::iter::once(fst.entries().map(|_| ()))).collect();
            failures += results.iter().filter(|r| r.is_err()).count();
        }
    }
    assert!(failures > 0);
}

#[test]
fn empty_key_without_outputs_reloads() {
    let mut builder = Builder::new(InputType::Byte1, NoOutputs::new());
    builder.add(&[], NoOutput).unwrap();
    builder.add(&to_ints(b"a"), NoOutput).unwrap();
    let fst = builder.finish().unwrap();

    let loaded = Fst::from_bytes(&saved(&fst), NoOutputs::new()).unwrap();
    assert_eq!(loaded.get(&[]).unwrap(), Some(NoOutput));
    assert_eq!(loaded.get(&to_ints(b"a")).unwrap(), Some(NoOutput));
    assert_eq!(loaded.get(&to_ints(b"b")).unwrap(), None);
    assert_eq!(saved(&loaded), saved(&fst));
}

#[test]
fn entry_map_matches_btree_order() {
    let mut expected = BTreeMap::new();
    for (i, word) in ["zeta", "alpha", "beta", "alphabet", "gamma", "alp"].iter().enumerate() {
        expected.insert(to_ints(word.as_bytes()), i as u64 + 1);
    }
    let mut builder = Builder::new(InputType::Byte1, PositiveIntOutputs::new());
    for (key, value) in &expected {
        builder.add(key, *value).unwrap();
    }
    let fst = builder.finish().unwrap();
    let entries: Vec<(Vec<i32>, u64)> = expected.into_iter().collect();
    assert_eq!(fst.entries().unwrap(), entries);
}
