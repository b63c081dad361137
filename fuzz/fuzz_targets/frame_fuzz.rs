//! Frame reader fuzz target: arbitrary bytes, split at an arbitrary point, through the stream
//! reader and the dispatch table of a small dialect. Must not panic, and every byte must be
//! accounted for as a frame or as skipped input.
//! Build with: cargo fuzz run frame_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const DIALECT: &str = r#"
dialect fuzz;
message HEARTBEAT = 0 { type: uint8_t; custom_mode: uint32_t; }
message STATUS = 1 { load: uint16_t; extensions; label: char[8]; }
message WIDE = 70000 { values: int32_t[4]; }
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(dialect) = mavgen::parse(DIALECT) else { return };
    let mut set = mavgen::DialectSet::new();
    if set.insert(dialect).is_err() {
        return;
    }
    let Ok(table) = set.dispatch_table(&["fuzz"]) else { return };

    let split = data.first().map(|&b| b as usize % (data.len() + 1)).unwrap_or(0);
    let mut reader = mavgen::FrameReader::new(table.fingerprints().clone());
    reader.push(&data[..split]);
    let mut consumed = 0u64;
    while let Some(f) = reader.next_frame() {
        consumed += (f.byte_range.1 - f.byte_range.0) as u64;
        let _ = table.decode(&f.frame.packet);
    }
    reader.push(&data[split..]);
    reader.close();
    while let Some(f) = reader.next_frame() {
        consumed += (f.byte_range.1 - f.byte_range.0) as u64;
        let _ = table.decode(&f.frame.packet);
    }
    assert_eq!(consumed + reader.stats().skipped_bytes, data.len() as u64);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run frame_fuzz");
}
