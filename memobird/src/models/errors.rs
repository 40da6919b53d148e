use thiserror::Error;

/// 接口调用相关错误
///
/// 处理与咕咕机服务端交互时的失败场景。
/// 业务层面的拒绝(如 `code != 1`、二维码过期)不属于错误,
/// 以 `bool` 或枚举结果返回。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 服务器不可达
    /// - DNS解析失败
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// 请求超时
    ///
    /// 单次请求超过传输层超时时间(默认5秒)
    #[error("请求超时: {0}")]
    Timeout(String),

    /// JSON解析失败
    ///
    /// 响应体不是合法的JSON
    #[error("响应数据解析失败: {0}")]
    JsonParseFailed(String),

    /// 响应格式无效
    ///
    /// 响应是JSON但不符合接口约定 (如不是对象、缺少必需字段)
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    /// 会话未打开
    ///
    /// 在 `open()` 之前或 `close()` 之后发起请求
    #[error("会话未打开,请先调用 open()")]
    SessionClosed,

    /// 没有可轮询的二维码
    #[error("当前没有待确认的二维码")]
    NoQrTicket,

    /// 传输层初始化失败
    #[error("HTTP客户端创建失败: {0}")]
    TransportInit(String),
}

/// 会话快照存储相关错误
///
/// 读取失败不会走到这里: 快照缺失或损坏时直接使用空的cookie jar。
/// 只有写入快照失败才会返回给调用者。
#[derive(Debug, Error)]
pub enum StorageError {
    /// 文件读写失败
    #[error("会话文件读写失败: {0}")]
    Io(String),

    /// 序列化/反序列化失败
    #[error("会话数据序列化失败: {0}")]
    SerializationError(String),
}

/// 配置相关错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 无效的接口地址
    #[error("无效的URL {key}: {value}")]
    InvalidUrl { key: String, value: String },
}

/// 应用级错误
///
/// 汇总各层错误,供门面 `MemobirdClient` 和命令行使用。
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 本地文件错误 (如上传的图片无法读取)
    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 实现从reqwest::Error到ApiError的转换
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_connect() {
            ApiError::NetworkFailed(format!("无法连接到服务器: {}", err))
        } else {
            ApiError::NetworkFailed(err.to_string())
        }
    }
}

/// 实现从serde_json::Error到相关错误的转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonParseFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_parse_failure() {
        let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let api: ApiError = err.into();
        assert!(matches!(api, ApiError::JsonParseFailed(_)));
    }

    #[test]
    fn test_io_error_maps_to_storage_error() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let storage: StorageError = err.into();
        assert!(storage.to_string().contains("denied"));
    }

    #[test]
    fn test_app_error_wraps_layers() {
        let app: AppError = ApiError::SessionClosed.into();
        assert!(matches!(app, AppError::Api(ApiError::SessionClosed)));
        assert_eq!(app.to_string(), ApiError::SessionClosed.to_string());
    }
}
