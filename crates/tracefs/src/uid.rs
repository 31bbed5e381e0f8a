//! 트레이싱 인스턴스 이름 생성

/// 유일한 문자열을 제공하는 trait
pub trait UidProvider: Send + Sync {
    fn uid(&self) -> String;
}

/// `<prefix><UUID v4>` 형식의 이름을 만드는 구현
#[derive(Debug, Clone)]
pub struct UuidProvider {
    prefix: String,
}

impl UuidProvider {
    /// 기본 접두어
    pub const DEFAULT_PREFIX: &'static str = "sockwatch-";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl UidProvider for UuidProvider {
    fn uid(&self) -> String {
        format!("{}{}", self.prefix, uuid::Uuid::new_v4())
    }
}

/// 항상 같은 이름을 반환하는 구현
#[derive(Debug, Clone)]
pub struct FixedUid(pub String);

impl UidProvider for FixedUid {
    fn uid(&self) -> String {
        self.0.clone()
    }
}
