#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sockwatch_tracefs::{FieldParser, SlicingFieldParser};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    input: Vec<u8>,
    separator: Vec<u8>,
    expect_more_fields: bool,
}

fuzz_target!(|fuzz: FuzzInput| {
    let fields = SlicingFieldParser;

    let mut cursor: &[u8] = &fuzz.input;
    if let Ok(field) = fields.next_field(&mut cursor, &fuzz.separator, fuzz.expect_more_fields) {
        // 토큰과 남은 커서는 원본보다 길 수 없다
        assert!(field.bytes().len() + cursor.len() <= fuzz.input.len());
    }

    let mut cursor: &[u8] = &fuzz.input;
    if let Ok(tags) = fields.tagged_fields(&mut cursor) {
        assert!(tags.len() <= fuzz.input.len());
    }
});
