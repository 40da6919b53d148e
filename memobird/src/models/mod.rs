//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (接口、存储、配置、应用级错误)
//! - cookie / cookie_jar: cookie记录与按域名分桶的jar
//! - session_snapshot: 会话快照文件格式
//! - envelope: 接口统一响应外壳
//! - account: 账号与设备信息,登录判定
//! - qr_ticket / qr_login_flow: 扫码登录票据与流程状态机
//! - client_config: 客户端配置
//! - paper: 纸条HTML

pub mod account;
pub mod client_config;
pub mod cookie;
pub mod cookie_jar;
pub mod envelope;
pub mod errors;
pub mod paper;
pub mod qr_login_flow;
pub mod qr_ticket;
pub mod session_snapshot;

// 重导出常用类型,简化外部引用
pub use account::{user_id_indicates_login, AccountInfo, Device};
pub use client_config::{ClientConfig, Endpoints};
pub use cookie::{Cookie, CookieAttribute};
pub use cookie_jar::{CookieJar, CookieJarHandle};
pub use envelope::Envelope;
pub use errors::{ApiError, AppError, ConfigError, StorageError};
pub use paper::{ImageItem, Paper, PaperItem, TextItem};
pub use qr_login_flow::{QrFlowStep, QrLoginFlow};
pub use qr_ticket::{AuthState, QrLoginOutcome, QrPollStatus, QrTicket};
pub use session_snapshot::SessionSnapshot;
