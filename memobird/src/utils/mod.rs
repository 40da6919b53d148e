//! 工具模块
//!
//! - logger: 日志初始化与结构化日志宏
//! - time_utils: cookie时间属性解析

pub mod logger;
pub mod time_utils;
