#![no_main]

use libfuzzer_sys::fuzz_target;
use sockwatch_tracefs::{EventParser, SlicingFieldParser, TraceFsEventParser};

fuzz_target!(|data: &[u8]| {
    let parser = TraceFsEventParser::new(SlicingFieldParser);

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(event) = parser.to_event(data) {
        assert!(!event.command_on_cpu.is_empty());
    }
});
