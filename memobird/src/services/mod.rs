//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `cookie_codec`: Set-Cookie解析,jar与快照互转
//! - `request_client`: 带cookie同步的HTTP原语
//! - `session_store`: 传输层生命周期与快照持久化
//! - `auth_service`: 账号刷新、密码/扫码登录、注销
//! - `print_service`: 打印纸条
//! - `upload_service`: 上传图片
//! - `memobird_client`: 对外门面
//!
//! # 服务架构
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                MemobirdClient                │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────┐ │
//! │  │AuthService │ │PrintService│ │UploadSvc  │ │
//! │  └─────┬──────┘ └─────┬──────┘ └─────┬─────┘ │
//! │        └──────────────┼──────────────┘       │
//! │                ┌──────▼───────┐              │
//! │                │RequestClient │◄── CookieJar │
//! │                └──────▲───────┘       ▲      │
//! │                ┌──────┴───────┐       │      │
//! │                │ SessionStore ├───────┘      │
//! │                └──────────────┘              │
//! └──────────────────────────────────────────────┘
//!          │                        │
//!          ▼                        ▼
//!   w.memobird.cn             memobird.json
//! ```

pub mod auth_service;
pub mod cookie_codec;
pub mod memobird_client;
pub mod print_service;
pub mod request_client;
pub mod session_store;
pub mod upload_service;

pub use auth_service::AuthService;
pub use cookie_codec::CookieCodec;
pub use memobird_client::MemobirdClient;
pub use print_service::PrintService;
pub use request_client::RequestClient;
pub use session_store::SessionStore;
pub use upload_service::UploadService;
