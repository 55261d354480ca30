#![no_main]
use libfuzzer_sys::fuzz_target;

use csv_line::{escape, tokenize, Fields};

fuzz_target!(|data: &[u8]| {
    let line = match std::str::from_utf8(data) {
        Ok(line) => line,
        Err(_) => return,
    };
    let owned = tokenize(line, ',');
    let lazy: Vec<String> =
        Fields::new(line, ',').map(|f| f.into_owned()).collect();
    assert_eq!(owned, lazy);

    for field in &owned {
        let escaped = escape(field, ';');
        if !field.contains(|c: char| c == '\r' || c == '\n') {
            assert_eq!(tokenize(&escaped, ';'), vec![field.clone()]);
        }
    }
});
