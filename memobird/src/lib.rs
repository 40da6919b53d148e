//! 咕咕机 (Memobird) 云打印客户端
//!
//! - 会话cookie持久化到本地JSON快照,跨进程保持登录
//! - 密码登录与扫码登录 (二维码过期自动续期,可取消)
//! - 打印HTML纸条、上传图片
//!
//! 入口是 [`MemobirdClient`]。

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
    AccountInfo, ApiError, AppError, AuthState, ClientConfig, ConfigError, Cookie, CookieJar,
    Device, Paper, QrLoginOutcome, QrPollStatus, QrTicket, StorageError,
};
pub use services::MemobirdClient;
