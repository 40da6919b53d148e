use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;

use crate::models::cookie::Cookie;
use crate::models::errors::StorageError;

/// 会话快照
///
/// 持久化的唯一产物,文件格式:
/// `{"cookies": {"<domain>": [{"<attr>": "<value>", ...}, ...], ...}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub cookies: BTreeMap<String, Vec<Cookie>>,
}

/// 快照文件的外层结构,每个域名桶保留原始JSON文本
#[derive(Deserialize)]
struct RawSnapshot<'a> {
    #[serde(borrow)]
    cookies: BTreeMap<String, &'a RawValue>,
}

impl SessionSnapshot {
    pub fn new(cookies: BTreeMap<String, Vec<Cookie>>) -> Self {
        Self { cookies }
    }

    /// 宽松地解析快照文件内容
    ///
    /// 顶层结构错误 (非JSON、缺少 `cookies` 对象) 返回错误,由调用方退回空jar。
    /// 单个域名桶或单个cookie损坏时只跳过该部分。
    pub fn from_json_str(text: &str) -> Result<Self, StorageError> {
        // cookie对象的第一个非保留键是名字,必须按原文顺序交给 `Cookie` 解析,
        // 不能先转成 `Value` (其对象键会被重新排序)
        let root: RawSnapshot<'_> = serde_json::from_str(text).map_err(|e| {
            StorageError::SerializationError(format!("invalid session snapshot: {}", e))
        })?;

        let mut cookies = BTreeMap::new();
        for (domain, bucket) in root.cookies {
            let entries: Vec<&RawValue> = match serde_json::from_str(bucket.get()) {
                Ok(entries) => entries,
                Err(_) => {
                    tracing::warn!(domain = %domain, "Skipping malformed cookie bucket");
                    continue;
                }
            };

            let parsed: Vec<Cookie> = entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_str::<Cookie>(entry.get()) {
                    Ok(cookie) => Some(cookie),
                    Err(e) => {
                        tracing::warn!(domain = %domain, error = %e, "Skipping malformed cookie entry");
                        None
                    }
                })
                .collect();
            cookies.insert(domain, parsed);
        }

        Ok(Self { cookies })
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, StorageError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies.values().map(Vec::len).sum()
    }
}
