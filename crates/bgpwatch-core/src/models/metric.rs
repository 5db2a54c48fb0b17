//! 익스포터 메트릭 레코드.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 텍스트 노출 포맷 한 줄에서 추출한 메트릭.
///
/// 한 번의 폴링 안에서만 생성·소비된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// 메트릭 이름 (예: `bird_protocol_up`)
    pub name: String,
    /// 레이블 (키 중복 시 마지막 값)
    pub labels: HashMap<String, String>,
    /// 값
    pub value: f64,
}

impl MetricRecord {
    /// 레이블 값 조회
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}
