#![no_main]

use adcpack::{print_item, Codec, ItemReader, PrintConfig, RawDataCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for item in ItemReader::new(data) {
        let Ok(item) = item else {
            break;
        };
        let Some(mut codec) = Codec::for_item_type(item.header.item_type) else {
            continue;
        };
        if let Ok(raw) = codec.read_any(&item) {
            assert!(raw.known);
            assert!(raw.num_pixels <= adcpack::MAX_PIXELS);
            // writing decoded data back must not panic
            let _ = codec.encode_to_bytes(&raw);
            let _ = print_item(&item, &PrintConfig::default());
        }
    }
});
