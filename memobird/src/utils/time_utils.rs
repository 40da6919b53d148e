use chrono::{DateTime, NaiveDateTime, Utc};

/// 解析cookie的 `Expires` 属性
///
/// 服务端返回的格式并不统一,依次尝试:
/// - RFC 1123: "Wed, 21 Oct 2015 07:28:00 GMT"
/// - Netscape: "Wed, 21-Oct-2015 07:28:00 GMT"
/// - RFC 850:  "Wednesday, 21-Oct-15 07:28:00 GMT"
///
/// 无法识别时返回 `None`,调用方将其视为"未设置过期时间"。
pub fn parse_cookie_expires(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &[
        "%a, %d-%b-%Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a, %d %b %Y %H:%M:%S GMT",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// 解析cookie的 `Max-Age` 属性 (秒)
pub fn parse_max_age(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}
