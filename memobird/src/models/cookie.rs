use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::time_utils::{parse_cookie_expires, parse_max_age};

/// 保留的cookie属性关键字
///
/// 这些键在 `Set-Cookie` 头和会话快照中都被解释为结构化属性,
/// 其余键要么是cookie本身的 name=value,要么进入扩展属性表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieAttribute {
    Domain,
    Path,
    Expires,
    MaxAge,
    Secure,
    HttpOnly,
    SameSite,
    Comment,
    Version,
}

impl CookieAttribute {
    /// 按关键字识别属性,忽略大小写
    pub fn parse(key: &str) -> Option<Self> {
        let attr = match key.trim().to_ascii_lowercase().as_str() {
            "domain" => Self::Domain,
            "path" => Self::Path,
            "expires" => Self::Expires,
            "max-age" => Self::MaxAge,
            "secure" => Self::Secure,
            "httponly" => Self::HttpOnly,
            "samesite" => Self::SameSite,
            "comment" => Self::Comment,
            "version" => Self::Version,
            _ => return None,
        };
        Some(attr)
    }

    /// 快照中使用的键名
    pub fn key(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Path => "path",
            Self::Expires => "expires",
            Self::MaxAge => "max-age",
            Self::Secure => "secure",
            Self::HttpOnly => "httponly",
            Self::SameSite => "samesite",
            Self::Comment => "comment",
            Self::Version => "version",
        }
    }

    /// 无值标志位属性 (`Secure` / `HttpOnly`)
    pub fn is_flag(self) -> bool {
        matches!(self, Self::Secure | Self::HttpOnly)
    }
}

/// 单个cookie记录
///
/// 唯一性由 (domain, name) 决定。已知属性使用类型化字段,
/// 未识别的属性原样保存在 `extensions` 中,保证快照往返不丢数据。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,

    /// 所属域名,空字符串表示不限主机
    pub domain: String,
    pub path: Option<String>,

    /// 原始过期时间字符串,解析在使用时进行
    pub expires: Option<String>,
    pub max_age: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub comment: Option<String>,
    pub version: Option<String>,

    /// 未识别的属性 (键名原样保留)
    pub extensions: BTreeMap<String, String>,
}

impl Cookie {
    /// 创建新的cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// 设置域名 (构建器模式)
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = normalize_domain(&domain.into());
        self
    }

    /// 设置路径 (构建器模式)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// 写入一个保留属性
    ///
    /// 空字符串视为"未设置"。标志位属性取值为真时置位。
    pub fn set_attribute(&mut self, attr: CookieAttribute, value: &str) {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        match attr {
            CookieAttribute::Domain => self.domain = normalize_domain(value),
            CookieAttribute::Path => self.path = text,
            CookieAttribute::Expires => self.expires = text,
            CookieAttribute::MaxAge => self.max_age = text,
            CookieAttribute::Secure => self.secure = is_truthy(value),
            CookieAttribute::HttpOnly => self.http_only = is_truthy(value),
            CookieAttribute::SameSite => self.same_site = text,
            CookieAttribute::Comment => self.comment = text,
            CookieAttribute::Version => self.version = text,
        }
    }

    /// 已设置的保留属性 (域名除外,按快照键名顺序)
    pub fn attributes(&self) -> Vec<(CookieAttribute, String)> {
        let mut attrs = Vec::new();
        let mut push = |attr, value: &Option<String>| {
            if let Some(v) = value {
                attrs.push((attr, v.clone()));
            }
        };
        push(CookieAttribute::Path, &self.path);
        push(CookieAttribute::Expires, &self.expires);
        push(CookieAttribute::MaxAge, &self.max_age);
        push(CookieAttribute::SameSite, &self.same_site);
        push(CookieAttribute::Comment, &self.comment);
        push(CookieAttribute::Version, &self.version);
        if self.secure {
            attrs.push((CookieAttribute::Secure, "true".to_string()));
        }
        if self.http_only {
            attrs.push((CookieAttribute::HttpOnly, "true".to_string()));
        }
        attrs
    }

    /// 过期时间 (无法解析时为 `None`)
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires.as_deref().and_then(parse_cookie_expires)
    }

    /// 在 `now` 时刻是否已过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    /// 服务端是否在要求删除该cookie
    ///
    /// `Max-Age <= 0` 或过期时间已过。
    pub fn is_removal(&self, now: DateTime<Utc>) -> bool {
        let by_max_age = self
            .max_age
            .as_deref()
            .and_then(parse_max_age)
            .is_some_and(|secs| secs <= 0);
        by_max_age || self.is_expired_at(now)
    }

    /// 域名是否匹配请求主机
    ///
    /// 空域名匹配任何主机。
    pub fn matches_host(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// 路径是否匹配请求路径
    pub fn matches_path(&self, request_path: &str) -> bool {
        match self.path.as_deref() {
            None | Some("") | Some("/") => true,
            Some(path) => {
                request_path == path
                    || request_path
                        .strip_prefix(path)
                        .is_some_and(|rest| path.ends_with('/') || rest.starts_with('/'))
            }
        }
    }

    /// 用于日志的描述,不包含cookie值
    pub fn describe(&self) -> String {
        format!("{}@{}", self.name, self.domain)
    }
}

/// 规范化域名: 去掉首部的点并转为小写
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value.eq_ignore_ascii_case("false") || value == "0")
}

/// 快照中的cookie对象
///
/// 扁平的键值表: 先写cookie自身的 `name: value`,
/// 再写保留属性,最后写扩展属性。
impl Serialize for Cookie {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attrs = self.attributes();
        let mut map = serializer.serialize_map(Some(2 + attrs.len() + self.extensions.len()))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.serialize_entry(CookieAttribute::Domain.key(), &self.domain)?;
        for (attr, value) in &attrs {
            map.serialize_entry(attr.key(), value)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 按文档顺序读取cookie对象
///
/// - 保留键 → 类型化字段
/// - 第一个非保留键 → cookie的 name/value
/// - 之后的非保留键 → 扩展属性
///
/// 非字符串的标量值会被转为字符串,没有名字的对象视为无效。
impl<'de> Deserialize<'de> for Cookie {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CookieVisitor)
    }
}

struct CookieVisitor;

impl<'de> Visitor<'de> for CookieVisitor {
    type Value = Cookie;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a cookie object of attribute/value pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Cookie, A::Error> {
        let mut cookie = Cookie::default();
        let mut named = false;

        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            let value = value_to_string(value);
            match CookieAttribute::parse(&key) {
                Some(attr) => cookie.set_attribute(attr, &value),
                None if !named => {
                    cookie.name = key;
                    cookie.value = value;
                    named = true;
                }
                None => {
                    cookie.extensions.insert(key, value);
                }
            }
        }

        if !named || cookie.name.is_empty() {
            return Err(de::Error::custom("cookie object has no name/value pair"));
        }
        Ok(cookie)
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => if b { "true".to_string() } else { String::new() },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_keywords_case_insensitive() {
        assert_eq!(CookieAttribute::parse("Max-Age"), Some(CookieAttribute::MaxAge));
        assert_eq!(CookieAttribute::parse("HTTPONLY"), Some(CookieAttribute::HttpOnly));
        assert_eq!(CookieAttribute::parse("ASP.NET_SessionId"), None);
    }

    #[test]
    fn test_domain_normalized() {
        let cookie = Cookie::new("a", "1").with_domain(".Memobird.CN");
        assert_eq!(cookie.domain, "memobird.cn");
    }

    #[test]
    fn test_matches_host() {
        let cookie = Cookie::new("a", "1").with_domain("memobird.cn");
        assert!(cookie.matches_host("memobird.cn"));
        assert!(cookie.matches_host("w.memobird.cn"));
        assert!(!cookie.matches_host("notmemobird.cn"));
        assert!(Cookie::new("b", "2").matches_host("anything.example"));
    }

    #[test]
    fn test_matches_path() {
        let cookie = Cookie::new("a", "1").with_path("/cn");
        assert!(cookie.matches_path("/cn"));
        assert!(cookie.matches_path("/cn/ashx/DBInterface.ashx"));
        assert!(!cookie.matches_path("/cnx"));
        assert!(!cookie.matches_path("/en"));
    }

    #[test]
    fn test_removal_by_max_age_and_expires() {
        let now = Utc::now();
        let mut cookie = Cookie::new("a", "1");
        assert!(!cookie.is_removal(now));

        cookie.set_attribute(CookieAttribute::MaxAge, "0");
        assert!(cookie.is_removal(now));

        let mut old = Cookie::new("b", "2");
        old.set_attribute(CookieAttribute::Expires, "Thu, 01 Jan 1970 00:00:00 GMT");
        assert!(old.is_removal(now));
    }

    #[test]
    fn test_serialize_puts_name_first() {
        let mut cookie = Cookie::new("ASP.NET_SessionId", "abc").with_domain("w.memobird.cn");
        cookie.set_attribute(CookieAttribute::Path, "/");
        cookie.http_only = true;
        cookie.extensions.insert("Priority".to_string(), "High".to_string());

        let text = serde_json::to_string(&cookie).unwrap();
        assert!(text.starts_with("{\"ASP.NET_SessionId\":\"abc\""));
        assert!(text.contains("\"httponly\":\"true\""));
        assert!(text.contains("\"Priority\":\"High\""));

        let back: Cookie = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cookie);
    }

    #[test]
    fn test_deserialize_legacy_layout_with_name_last() {
        // 属性在前、cookie本身在最后,空字符串代表未设置
        let value = json!({
            "expires": "",
            "path": "/",
            "comment": "",
            "domain": "w.memobird.cn",
            "max-age": "",
            "secure": "",
            "httponly": "",
            "version": "",
            "samesite": "",
            "ASP.NET_SessionId": "abc"
        });
        let cookie: Cookie = serde_json::from_value(value).unwrap();
        assert_eq!(cookie.name, "ASP.NET_SessionId");
        assert_eq!(cookie.value, "abc");
        assert_eq!(cookie.domain, "w.memobird.cn");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert!(cookie.expires.is_none());
        assert!(!cookie.secure);
    }

    #[test]
    fn test_deserialize_accepts_non_string_scalars() {
        let value = json!({"uid": 123456789, "secure": true, "max-age": 60});
        let cookie: Cookie = serde_json::from_value(value).unwrap();
        assert_eq!(cookie.value, "123456789");
        assert!(cookie.secure);
        assert_eq!(cookie.max_age.as_deref(), Some("60"));
    }

    #[test]
    fn test_deserialize_without_name_fails() {
        let value = json!({"domain": "w.memobird.cn", "path": "/"});
        assert!(serde_json::from_value::<Cookie>(value).is_err());
    }
}
