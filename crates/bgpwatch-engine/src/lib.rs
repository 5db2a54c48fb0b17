//! # bgpwatch-engine
//!
//! BIRD 익스포터 메트릭을 세션 인벤토리에 반영하는 엔진.
//!
//! 폴링 1회의 흐름:
//! `parser` → `aggregator` → (`classifier`) → `reconciler` → `alerting`.
//! `poller`가 전체 파이프라인을 PoP 단위로 직렬화해 실행한다.
//!
//! ## 모듈
//! - `parser`: 텍스트 노출 포맷 파싱 (관대한 파서)
//! - `aggregator`: 메트릭 레코드 → 세션 스냅샷 집계
//! - `classifier`: 프로토콜 이름/ASN 기반 세션 분류
//! - `reconciler`: 저장소 갱신, 자동 발견, 히스토리 기록/정리
//! - `alerting`: 상태 전이 감지 및 알림
//! - `poller`: PoP별 폴링 파이프라인

pub mod aggregator;
pub mod alerting;
pub mod classifier;
pub mod parser;
pub mod poller;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;
