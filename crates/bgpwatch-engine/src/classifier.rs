//! 세션 분류기.
//!
//! 프로토콜 이름 규칙과 알려진 트랜짓 ASN으로 세션 종류를 추정한다.
//! 규칙은 위에서부터 평가하며 처음 일치한 규칙이 이긴다. `peer` 부분 문자열
//! 검사가 더 구체적인 `up`/`down` 토큰 검사보다 먼저 오면 안 된다.

use bgpwatch_core::models::session::SessionType;
use once_cell::sync::Lazy;
use regex::Regex;

/// 알려진 트랜짓 사업자 ASN
pub const KNOWN_TRANSIT_ASNS: &[u32] = &[
    174, 1299, 3356, 6762, 6830, 2914, 3257, 6939, 5511, 3491, 1273, 6461,
];

/// 인터넷 익스체인지 브랜드 (부분 문자열)
pub const EXCHANGE_BRANDS: &[&str] = &["decix", "amsix", "linx", "nlix"];

const UPSTREAM_HINTS: &[&str] = &["upstream", "transit"];
const DOWNSTREAM_HINTS: &[&str] = &["downstream", "customer"];
const PEERING_HINTS: &[&str] = &["bgpexchange", "peer", "_ix", "exchange"];

static UP_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|_)up($|_)").expect("up 토큰 정규식 컴파일 실패"));

static DOWN_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|_)down($|_|wg|vxlan)").expect("down 토큰 정규식 컴파일 실패")
});

/// 분류 규칙 하나
struct Rule {
    /// 로그용 이름
    name: &'static str,
    /// 소문자 프로토콜 이름과 ASN을 받는 조건
    matches: fn(&str, u32) -> bool,
    category: SessionType,
}

/// 평가 순서가 곧 우선순위
static RULES: &[Rule] = &[
    Rule {
        name: "upstream-name",
        matches: |name, _| UP_TOKEN_RE.is_match(name) || contains_any(name, UPSTREAM_HINTS),
        category: SessionType::Upstream,
    },
    Rule {
        name: "downstream-name",
        matches: |name, _| DOWN_TOKEN_RE.is_match(name) || contains_any(name, DOWNSTREAM_HINTS),
        category: SessionType::Downstream,
    },
    Rule {
        name: "peering-name",
        matches: |name, _| contains_any(name, PEERING_HINTS) || contains_any(name, EXCHANGE_BRANDS),
        category: SessionType::Peering,
    },
    Rule {
        name: "transit-asn",
        matches: |_, asn| KNOWN_TRANSIT_ASNS.contains(&asn),
        category: SessionType::Upstream,
    },
];

/// 일치하는 규칙이 없을 때의 분류
const DEFAULT_CATEGORY: SessionType = SessionType::Peering;

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// 프로토콜 이름(대소문자 무시)과 피어 ASN으로 세션 분류
pub fn classify(protocol_name: &str, peer_asn: u32) -> SessionType {
    let name = protocol_name.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&name, peer_asn))
        .map(|rule| {
            tracing::trace!(protocol_name, rule = rule.name, "세션 분류 규칙 일치");
            rule.category
        })
        .unwrap_or(DEFAULT_CATEGORY)
}
