//! 텍스트 노출 포맷 파서.
//!
//! 익스포터가 내보내는 `name{k="v",...} value` 형태만 지원한다.
//! 매칭되지 않는 줄, 레이블 블록이 없는 줄, 숫자로 해석되지 않는 값은
//! 에러 없이 버린다 (관대한 파서).

use std::collections::HashMap;

use bgpwatch_core::models::metric::MetricRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// `metric_name{labels} value` (값 뒤의 타임스탬프 등은 무시)
static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_:][A-Za-z0-9_:]*)\{([^}]*)\}\s+([0-9.eE+-]+)")
        .expect("메트릭 줄 정규식 컴파일 실패")
});

/// 레이블 블록 안의 `key="value"` 쌍
static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)="([^"]*)""#).expect("레이블 정규식 컴파일 실패")
});

/// 노출 텍스트 전체를 메트릭 레코드 목록으로 변환
///
/// 줄 사이에 상태가 없으므로 같은 입력은 항상 같은 결과를 낸다.
pub fn parse_exposition(text: &str) -> Vec<MetricRecord> {
    records(text).collect()
}

/// 지연 평가 버전
pub fn records(text: &str) -> impl Iterator<Item = MetricRecord> + '_ {
    text.lines().filter_map(parse_line)
}

/// 한 줄 파싱 (주석/빈 줄/불일치 시 None)
pub fn parse_line(line: &str) -> Option<MetricRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let caps = LINE_RE.captures(line)?;
    let value: f64 = caps[3].parse().ok()?;

    Some(MetricRecord {
        name: caps[1].to_string(),
        labels: parse_labels(&caps[2]),
        value,
    })
}

/// 레이블 블록 파싱 (순서/개수 무관, 중복 키는 마지막 값)
fn parse_labels(block: &str) -> HashMap<String, String> {
    LABEL_RE
        .captures_iter(block)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}
