use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::errors::ApiError;

/// 咕咕机接口的统一响应外壳
///
/// 每个响应至少包含 `code` 字段,各接口再附加自己的字段
/// (`userId`、`smartCores`、`parameter`、`auth`、`expire` 等)。
///
/// 状态判断只依赖整数化后的字段值:
/// 缺失或无法解析一律按 `0` 处理,绝不默认成功。
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Map<String, Value>,
}

impl Envelope {
    /// 成功状态码
    pub const CODE_SUCCESS: i64 = 1;

    /// 解析响应体
    ///
    /// # 错误
    /// - `ApiError::JsonParseFailed`: 响应体不是JSON
    /// - `ApiError::InvalidResponse`: JSON不是对象
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(body) => Ok(Self { body }),
            other => Err(ApiError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_map(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// 状态码
    pub fn code(&self) -> i64 {
        self.int_field("code")
    }

    /// `code == 1`
    pub fn is_success(&self) -> bool {
        self.code() == Self::CODE_SUCCESS
    }

    /// 以整数读取字段
    ///
    /// 支持数字、数字字符串和布尔值,其余情况为 `0`。
    pub fn int_field(&self, key: &str) -> i64 {
        self.body.get(key).map(lenient_int).unwrap_or(0)
    }

    /// 以字符串读取字段 (数字会被转为字符串)
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// 必需的字符串字段
    pub fn require_str(&self, key: &str) -> Result<String, ApiError> {
        self.str_field(key)
            .ok_or_else(|| ApiError::InvalidResponse(format!("missing field `{}`", key)))
    }

    /// 将整个响应反序列化为具体类型
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.body.clone()))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.body
    }
}

fn lenient_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
