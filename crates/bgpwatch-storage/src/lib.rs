//! # bgpwatch-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 PoP/세션 인벤토리, 세션 히스토리, 알림 상태 추적,
//! 스키마 마이그레이션을 관리한다.
//!
//! ## 모듈
//! - `sqlite`: `SessionStore` + `PopRepository` 구현
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;
