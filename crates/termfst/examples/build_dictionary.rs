// Build an FST from a word list and query it.
//
// Words are keyed by code point. Reads one word per line (default: a small built-in list), assigns each
// distinct word its rank, saves the FST and looks words up again from the
// saved bytes.
//
//   cargo run -p termfst --example build_dictionary -- words.txt [queries...]

use std::fs;

use termfst::{Builder, Fst, InputType, PositiveIntOutputs};
use termfst_core::unicode::utf8_to_utf32;

const BUILTIN: &str = "auto\nkissa\nkoira\nmetsä\npuu\ntalo\nvesi\n";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let text = match args.next() {
        Some(path) => fs::read_to_string(&path)?,
        None => BUILTIN.to_string(),
    };
    let queries: Vec<String> = args.collect();

    let mut words: Vec<&str> = text.lines().map(str::trim).filter(|w| !w.is_empty()).collect();
    // UTF-8 byte order is code point order
    words.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    words.dedup();

    let mut builder = Builder::new(InputType::Byte4, PositiveIntOutputs::new());
    for (rank, word) in words.iter().enumerate() {
        builder.add(&utf8_to_utf32(word.as_bytes())?, rank as u64)?;
    }
    let fst = builder.finish()?;
    println!(
        "{} words -> {} nodes, {} arcs, {} bytes",
        words.len(),
        builder.node_count(),
        builder.arc_count(),
        fst.size_in_bytes()
    );

    let mut saved = Vec::new();
    fst.save(&mut saved)?;
    let loaded = Fst::from_bytes(&saved, PositiveIntOutputs::new())?;

    let queries: Vec<&str> = if queries.is_empty() {
        words.iter().take(5).copied().chain(["nonexistent"]).collect()
    } else {
        queries.iter().map(String::as_str).collect()
    };
    for query in queries {
        match loaded.get(&utf8_to_utf32(query.as_bytes())?)? {
            Some(rank) => println!("{query}: rank {rank}"),
            None => println!("{query}: not found"),
        }
    }
    Ok(())
}
