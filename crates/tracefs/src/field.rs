//! 필드 토크나이저 -- 바이트 커서 위의 zero-copy 파서
//!
//! 커서는 `&mut &[u8]`이며, 토큰을 반환할 때마다 구분자 뒤로 전진합니다.
//! 반환되는 토큰은 원본 버퍼를 빌린 슬라이스이므로 복사가 없습니다.
//!
//! # 사용 예시
//! ```
//! use sockwatch_tracefs::field::{Field, FieldParser, SlicingFieldParser};
//!
//! let parser = SlicingFieldParser;
//! let mut cursor: &[u8] = b"tracefs /sys/kernel/tracing tracefs rw 0 0";
//!
//! let device = parser.next_field(&mut cursor, b" ", true).unwrap();
//! assert_eq!(device, Field::Next(b"tracefs"));
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::FieldError;

/// `next_field`가 반환하는 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// 구분자 앞의 토큰. 뒤에 필드가 더 있을 수 있습니다.
    Next(&'a [u8]),
    /// 구분자가 없어 남은 입력 전체가 마지막 토큰이 됨
    Last(&'a [u8]),
}

impl<'a> Field<'a> {
    /// 토큰 바이트
    pub fn bytes(&self) -> &'a [u8] {
        match self {
            Self::Next(b) | Self::Last(b) => b,
        }
    }

    /// 마지막 토큰 여부
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Last(_))
    }
}

/// 한 라인에서 추출한 `key=value` 태그 모음
///
/// 키는 유일하며, 같은 키가 다시 나오면 나중 값이 이깁니다.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaggedFields<'a>(HashMap<&'a [u8], &'a [u8]>);

impl<'a> TaggedFields<'a> {
    /// 태그 값을 조회합니다.
    pub fn get(&self, tag: &str) -> Option<&'a [u8]> {
        self.0.get(tag.as_bytes()).copied()
    }

    /// 태그 존재 여부
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, tag: &'a [u8], value: &'a [u8]) {
        self.0.insert(tag, value);
    }
}

impl fmt::Display for TaggedFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.0.iter().collect();
        pairs.sort();
        for (i, (k, v)) in pairs.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(
                f,
                "{}={}",
                String::from_utf8_lossy(k),
                String::from_utf8_lossy(v)
            )?;
        }
        Ok(())
    }
}

/// 바이트 커서를 구성 필드로 분해하는 trait
pub trait FieldParser: Send + Sync {
    /// 다음 `separator` 앞의 토큰을 반환하고 커서를 구분자 뒤로 옮깁니다.
    ///
    /// # Errors
    /// - 커서가 비어 있으면 [`FieldError::UnexpectedEndOfInput`]
    /// - 구분자가 없고 `expect_more_fields`가 참이면 [`FieldError::UnexpectedEndOfInput`]
    /// - 토큰 길이가 0이면 [`FieldError::EmptyField`]
    ///
    /// 구분자가 없고 `expect_more_fields`가 거짓이면 남은 입력 전체를
    /// [`Field::Last`]로 반환하고 커서를 비웁니다. 이는 에러가 아닙니다.
    fn next_field<'a>(
        &self,
        cursor: &mut &'a [u8],
        separator: &[u8],
        expect_more_fields: bool,
    ) -> Result<Field<'a>, FieldError>;

    /// 커서의 나머지를 공백으로 구분된 `key=value` 태그로 파싱합니다.
    ///
    /// # Errors
    /// `=`가 뒤따르지 않는 태그나 빈 값은 [`next_field`](FieldParser::next_field)의
    /// 에러를 그대로 전파합니다.
    fn tagged_fields<'a>(&self, cursor: &mut &'a [u8]) -> Result<TaggedFields<'a>, FieldError> {
        let mut fields = TaggedFields::default();
        loop {
            let tag = self.next_field(cursor, b"=", true)?;
            let value = self.next_field(cursor, b" ", false)?;
            fields.insert(tag.bytes(), value.bytes());
            if value.is_last() {
                return Ok(fields);
            }
        }
    }
}

/// 슬라이싱 기반 [`FieldParser`] 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct SlicingFieldParser;

impl FieldParser for SlicingFieldParser {
    fn next_field<'a>(
        &self,
        cursor: &mut &'a [u8],
        separator: &[u8],
        expect_more_fields: bool,
    ) -> Result<Field<'a>, FieldError> {
        let input: &'a [u8] = *cursor;
        if input.is_empty() {
            return Err(FieldError::UnexpectedEndOfInput);
        }

        let Some(idx) = find(input, separator) else {
            if expect_more_fields {
                return Err(FieldError::UnexpectedEndOfInput);
            }
            *cursor = &input[input.len()..];
            return Ok(Field::Last(input));
        };

        let token = &input[..idx];
        *cursor = &input[idx + separator.len()..];

        if token.is_empty() {
            return Err(FieldError::EmptyField);
        }
        Ok(Field::Next(token))
    }
}

/// `haystack`에서 `needle`이 처음 나타나는 위치
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
