//! 이벤트 소스 trait -- 이벤트 생산자 확장 포인트

use crate::event::Event;

/// TCP 상태 변경 이벤트를 생산하는 trait
///
/// 단일 소비자가 [`event`](EventSource::event)를 반복 호출하고,
/// 다른 스레드가 [`close`](EventSource::close)로 블로킹 중인 읽기를 깨울 수 있어야 합니다.
pub trait EventSource: Send + Sync {
    /// 구현체 에러 타입
    type Error: std::error::Error + Send + Sync + 'static;

    /// 다음 이벤트를 반환합니다. 이벤트가 도착할 때까지 블로킹합니다.
    ///
    /// # Errors
    /// 소스가 닫혔거나 읽기/파싱에 실패하면 에러를 반환합니다.
    fn event(&self) -> Result<Event, Self::Error>;

    /// 모든 리소스를 해제합니다. 두 번째 호출부터는 아무 것도 하지 않습니다.
    ///
    /// # Errors
    /// 리소스 해제 중 발생한 첫 번째 에러를 반환합니다.
    fn close(&self) -> Result<(), Self::Error>;
}
