//! Parser fuzz target: feed arbitrary text to the dialect parser and plan what it accepts.
//! Neither step may panic. Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(dialect) = mavgen::parse(s) {
        for m in &dialect.messages {
            let _ = mavgen::plan_message(m, dialect.flags.sort_fields);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
