#![no_main]

use libfuzzer_sys::fuzz_target;
use mapverify_mappings::{ConstructorTable, Mappings, SuffixTable};

mod utils;

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };

    if let Ok(mappings) = Mappings::parse(text) {
        let reverse = mappings.reverse();
        for (original, mapped) in mappings.classes() {
            let _ = mappings.remap_class(&reverse.remap_class(mapped));
            let _ = mappings.remap_descriptor(&format!("(L{original};[I)L{mapped};"));
        }
    }
    let _ = ConstructorTable::parse(text);
    let _ = SuffixTable::parse(text);
});
