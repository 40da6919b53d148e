//! 会话的cookie jar
//!
//! 按域名分桶保存cookie,同一域名下同名cookie后写覆盖先写。
//! jar本身不做同步,在会话和请求客户端之间通过 [`CookieJarHandle`] 共享。

use chrono::Utc;
use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::cookie::{normalize_domain, Cookie};

/// 共享的cookie jar句柄
pub type CookieJarHandle = Arc<Mutex<CookieJar>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    /// 域名 → 该域名下的cookie (插入顺序)
    entries: BTreeMap<String, Vec<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 包装为共享句柄
    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(Mutex::new(self))
    }

    /// 保存响应 `url` 下发的cookie
    ///
    /// 未携带 `Domain` 属性的cookie归属于请求主机。
    /// `Domain` 与请求主机不匹配 (主机既不等于也不是其子域名) 的cookie被丢弃。
    ///
    /// # 返回值
    /// cookie是否被接受
    pub fn store(&mut self, mut cookie: Cookie, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        if cookie.domain.is_empty() {
            cookie.domain = normalize_domain(host);
        } else if !cookie.matches_host(host) {
            tracing::debug!(
                cookie = %cookie.describe(),
                host = %host,
                "Rejecting cookie for a domain the response host does not match"
            );
            return false;
        }
        self.insert(cookie);
        true
    }

    /// 按cookie自身的域名保存
    ///
    /// 服务端下发的删除指令 (`Max-Age<=0` 或过期时间已过) 会移除同名cookie。
    pub fn insert(&mut self, mut cookie: Cookie) {
        cookie.domain = normalize_domain(&cookie.domain);

        if cookie.is_removal(Utc::now()) {
            tracing::debug!(cookie = %cookie.describe(), "Cookie removed by server");
            self.remove(&cookie.domain, &cookie.name);
            return;
        }

        let bucket = self.entries.entry(cookie.domain.clone()).or_default();
        match bucket.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => bucket.push(cookie),
        }
    }

    /// 删除指定cookie,返回是否存在
    pub fn remove(&mut self, domain: &str, name: &str) -> bool {
        let domain = normalize_domain(domain);
        let Some(bucket) = self.entries.get_mut(&domain) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|c| c.name != name);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.entries.remove(&domain);
        }
        removed
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<&Cookie> {
        self.entries
            .get(&normalize_domain(domain))?
            .iter()
            .find(|c| c.name == name)
    }

    /// 生成请求 `url` 应携带的 `Cookie` 头
    ///
    /// 按域名、路径、`Secure` 标志过滤,跳过已过期的cookie。
    /// 没有匹配的cookie时返回 `None`。
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let is_https = url.scheme() == "https";
        let now = Utc::now();

        let pairs: Vec<String> = self
            .iter()
            .filter(|c| c.matches_host(host))
            .filter(|c| c.matches_path(path))
            .filter(|c| is_https || !c.secure)
            .filter(|c| !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// 遍历所有cookie (按域名排序)
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// cookie名称列表,用于日志 (不含值)
    pub fn sample_for_logging(&self) -> String {
        self.iter()
            .map(Cookie::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
