#![no_main]

use libfuzzer_sys::fuzz_target;
use sockwatch_tracefs::{MountsParser, ProcMountsParser, SlicingFieldParser};

fuzz_target!(|data: &[u8]| {
    let parser = ProcMountsParser::new(SlicingFieldParser);
    let mut reader = data;

    // 크래시나 패닉 없이 경로 또는 에러를 반환해야 한다
    let _ = parser.first_mountpoint(&mut reader, "tracefs");
});
