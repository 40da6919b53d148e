use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 日志文件名前缀,文件命名: memobird.2026-10-17.log
const LOG_FILE_PREFIX: &str = "memobird";

/// 初始化日志系统
///
/// - 控制台层: 人类可读格式,写到stderr,不干扰命令输出
/// - 文件层 (可选): JSON格式,按天轮转,非阻塞写入
/// - 环境变量控制: RUST_LOG=debug 可调整日志级别,默认INFO
///
/// # 参数
/// - `log_dir`: 日志目录,`None` 时只输出到控制台
///
/// # 返回值
/// 启用文件层时返回写入器的guard,调用者必须持有到程序退出,
/// guard被drop后文件写入器关闭。
///
/// # 示例日志
/// ```json
/// {
///   "timestamp": "2026-10-17T10:30:45.123Z",
///   "level": "INFO",
///   "target": "memobird::services::auth_service",
///   "fields": {
///     "event_type": "QrCodeGenerated",
///     "qr_parameter": "ab12cd"
///   }
/// }
/// ```
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    Ok(guard)
}

/// 日志宏辅助模块
///
/// 提供结构化日志的便捷宏
pub mod macros {
    /// 记录业务事件
    ///
    /// 使用示例:
    /// ```no_run
    /// use memobird::log_event;
    /// log_event!(
    ///     "QrCodeGenerated",
    ///     qr_parameter = "ab12cd",
    ///     image_url = "http://w.memobird.cn/qr/ab12cd.png"
    /// );
    /// ```
    #[macro_export]
    macro_rules! log_event {
        ($event_type:expr, $($field:tt = $value:expr),* $(,)?) => {
            tracing::info!(
                event_type = $event_type,
                $($field = $value),*
            );
        };
    }

    /// 记录错误事件
    ///
    /// 使用示例:
    /// ```no_run
    /// use memobird::log_error;
    /// log_error!(
    ///     "PollingFailed",
    ///     error = "connection timeout"
    /// );
    /// ```
    #[macro_export]
    macro_rules! log_error {
        ($event_type:expr, $($field:tt = $value:expr),* $(,)?) => {
            tracing::error!(
                event_type = $event_type,
                $($field = $value),*
            );
        };
    }
}
