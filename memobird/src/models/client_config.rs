use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::errors::ConfigError;
use crate::models::qr_login_flow::DEFAULT_POLL_INTERVAL;

/// 咕咕机统一接口地址
pub const DEFAULT_INTERFACE_URL: &str = "http://w.memobird.cn/cn/ashx/DBInterface.ashx";

/// 图片上传地址
pub const DEFAULT_UPLOAD_URL: &str = "http://w.memobird.cn/cn/Plug-in/ueditor/net/controller.ashx";

/// 默认会话快照文件
pub const DEFAULT_SESSION_PATH: &str = "memobird.json";

/// 单次请求超时
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// 客户端配置
///
/// 一个客户端实例对应一个会话快照文件。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 会话快照路径
    pub session_path: PathBuf,

    /// 统一接口地址
    pub interface_url: String,

    /// 图片上传地址
    pub upload_url: String,

    /// 传输层单次请求超时
    pub request_timeout: Duration,

    /// 扫码登录轮询间隔
    pub qr_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            interface_url: DEFAULT_INTERFACE_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            qr_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// 从环境变量加载配置
    ///
    /// 先尝试加载当前目录的 `.env`,然后读取:
    /// - MEMOBIRD_SESSION_PATH: 会话快照路径 (默认: memobird.json)
    /// - MEMOBIRD_INTERFACE_URL: 接口地址
    /// - MEMOBIRD_UPLOAD_URL: 上传地址
    /// - MEMOBIRD_REQUEST_TIMEOUT_SECS: 请求超时秒数 (默认: 5)
    /// - MEMOBIRD_QR_POLL_INTERVAL_MS: 扫码轮询间隔毫秒 (默认: 1000)
    ///
    /// 数值无法解析时使用默认值并记录警告,URL无效时返回错误。
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded, using process environment");
        }
        Self::from_process_env()
    }

    /// 只读取进程环境变量,不加载 `.env`
    pub fn from_process_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let session_path = env::var("MEMOBIRD_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_path);
        let interface_url =
            env::var("MEMOBIRD_INTERFACE_URL").unwrap_or(defaults.interface_url);
        let upload_url = env::var("MEMOBIRD_UPLOAD_URL").unwrap_or(defaults.upload_url);

        let request_timeout = env_number("MEMOBIRD_REQUEST_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let qr_poll_interval = env_number("MEMOBIRD_QR_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.qr_poll_interval);

        let config = Self {
            session_path,
            interface_url,
            upload_url,
            request_timeout,
            qr_poll_interval,
        };
        config.endpoints()?;

        tracing::info!(
            session_path = %config.session_path.display(),
            interface_url = %config.interface_url,
            "Client configuration loaded"
        );

        Ok(config)
    }

    /// 设置会话快照路径 (构建器模式)
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    /// 设置接口地址 (构建器模式)
    pub fn with_interface_url(mut self, url: impl Into<String>) -> Self {
        self.interface_url = url.into();
        self
    }

    /// 设置上传地址 (构建器模式)
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_qr_poll_interval(mut self, interval: Duration) -> Self {
        self.qr_poll_interval = interval;
        self
    }

    /// 解析并校验接口地址
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        Ok(Endpoints {
            interface: parse_url("interface_url", &self.interface_url)?,
            upload: parse_url("upload_url", &self.upload_url)?,
        })
    }
}

/// 校验后的接口地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub interface: Url,
    pub upload: Url,
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn env_number(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "Invalid number in environment, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.session_path, PathBuf::from("memobird.json"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.qr_poll_interval, Duration::from_secs(1));

        let endpoints = config.endpoints().unwrap();
        assert_eq!(endpoints.interface.host_str(), Some("w.memobird.cn"));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_session_path("/tmp/session.json")
            .with_interface_url("http://127.0.0.1:9000/cn/ashx/DBInterface.ashx")
            .with_qr_poll_interval(Duration::from_millis(10));
        assert_eq!(config.session_path, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.qr_poll_interval, Duration::from_millis(10));
        assert_eq!(config.endpoints().unwrap().interface.port(), Some(9000));
    }

    #[test]
    fn test_from_process_env_reads_overrides() {
        env::set_var("MEMOBIRD_QR_POLL_INTERVAL_MS", "25");
        env::set_var("MEMOBIRD_REQUEST_TIMEOUT_SECS", "soon");

        let config = ClientConfig::from_process_env().unwrap();
        assert_eq!(config.qr_poll_interval, Duration::from_millis(25));
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        env::remove_var("MEMOBIRD_QR_POLL_INTERVAL_MS");
        env::remove_var("MEMOBIRD_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = ClientConfig::default().with_upload_url("not a url");
        match config.endpoints() {
            Err(ConfigError::InvalidUrl { key, .. }) => assert_eq!(key, "upload_url"),
            other => panic!("Expected InvalidUrl, got {:?}", other),
        }
    }
}
