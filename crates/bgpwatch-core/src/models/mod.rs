//! bgpwatch 도메인 모델.
//!
//! 익스포터 메트릭, 세션 스냅샷/영속 세션, 히스토리, 알림 데이터 구조체를 정의한다.

pub mod history;
pub mod metric;
pub mod notification;
pub mod pop;
pub mod report;
pub mod session;
