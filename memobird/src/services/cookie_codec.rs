use reqwest::header::HeaderValue;
use reqwest::Url;
use std::collections::BTreeMap;

use crate::models::{Cookie, CookieAttribute, CookieJar, SessionSnapshot};

/// Cookie编解码
///
/// 职责:
/// - 解析服务端下发的 `Set-Cookie` 头 (大小写、顺序都不规范)
/// - cookie jar 与会话快照之间的相互转换
///
/// 所有解析都是尽力而为: 畸形输入只会被跳过,不会中断请求流程。
pub struct CookieCodec;

impl CookieCodec {
    /// 解析单个 `Set-Cookie` 头
    ///
    /// 规则:
    /// - 以 `;` 分段,键名忽略大小写
    /// - 保留关键字 (domain、path、expires、max-age 等) 写入类型化字段
    /// - 第一个非保留的 `key=value` 是cookie本身
    /// - 其余非保留键原样放入扩展属性
    /// - `Secure` / `HttpOnly` 无值也视为置位,其它无值片段忽略
    ///
    /// # 返回值
    /// 无法提取cookie名称时返回 `None`,由合并步骤跳过
    pub fn decode_set_cookie_header(raw: &str) -> Option<Cookie> {
        let mut cookie = Cookie::default();
        let mut named = false;

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            match segment.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    let value = value.trim();
                    if key.is_empty() {
                        continue;
                    }
                    match CookieAttribute::parse(key) {
                        Some(attr) => cookie.set_attribute(attr, value),
                        None if !named => {
                            cookie.name = key.to_string();
                            cookie.value = value.to_string();
                            named = true;
                        }
                        None => {
                            cookie.extensions.insert(key.to_string(), value.to_string());
                        }
                    }
                }
                None => match CookieAttribute::parse(segment) {
                    Some(attr) if attr.is_flag() => cookie.set_attribute(attr, "true"),
                    _ => tracing::trace!(segment = %segment, "Ignoring bare cookie token"),
                },
            }
        }

        named.then_some(cookie)
    }

    /// 把一组响应头合并进jar
    ///
    /// 没有 `Set-Cookie` 头时什么也不做;无法按UTF-8读取或无法解析的单个头被跳过。
    ///
    /// # 返回值
    /// 实际合并的cookie数量
    pub fn merge_set_cookie_headers<'a, I>(jar: &mut CookieJar, headers: I, url: &Url) -> usize
    where
        I: IntoIterator<Item = &'a HeaderValue>,
    {
        let mut merged = 0;
        for header in headers {
            let Ok(raw) = header.to_str() else {
                tracing::warn!(url = %url, "Skipping non-UTF-8 Set-Cookie header");
                continue;
            };
            match Self::decode_set_cookie_header(raw) {
                Some(cookie) => {
                    tracing::trace!(cookie = %cookie.name, url = %url, "Cookie received");
                    if jar.store(cookie, url) {
                        merged += 1;
                    }
                }
                None => tracing::warn!(url = %url, "Skipping unparsable Set-Cookie header"),
            }
        }
        merged
    }

    /// jar → 按域名分组的cookie列表
    ///
    /// 空字符串域名是合法的分组,表示不限主机的cookie。
    pub fn export_jar(jar: &CookieJar) -> BTreeMap<String, Vec<Cookie>> {
        let mut buckets: BTreeMap<String, Vec<Cookie>> = BTreeMap::new();
        for cookie in jar.iter() {
            buckets
                .entry(cookie.domain.clone())
                .or_default()
                .push(cookie.clone());
        }
        buckets
    }

    /// 按域名分组的cookie列表 → jar
    ///
    /// 没有域名属性的cookie归属于所在分组;自带域名的cookie按自身域名保存。
    pub fn import_jar(buckets: BTreeMap<String, Vec<Cookie>>) -> CookieJar {
        let mut jar = CookieJar::new();
        for (domain, cookies) in buckets {
            for mut cookie in cookies {
                if cookie.domain.is_empty() {
                    cookie.domain = domain.clone();
                }
                jar.insert(cookie);
            }
        }
        jar
    }

    /// jar → 会话快照
    pub fn to_snapshot(jar: &CookieJar) -> SessionSnapshot {
        SessionSnapshot::new(Self::export_jar(jar))
    }

    /// 会话快照 → jar
    pub fn from_snapshot(snapshot: SessionSnapshot) -> CookieJar {
        Self::import_jar(snapshot.cookies)
    }
}
