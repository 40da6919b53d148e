use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 扫码登录票据
///
/// 服务端为每张二维码签发一个不透明的 `parameter`,
/// 轮询时用它关联二维码与登录确认。同一时刻最多存在一张有效票据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrTicket {
    /// 服务端签发的票据参数
    pub parameter: String,

    /// 二维码图片的绝对地址,交给用户扫码
    pub image_url: String,

    /// 签发时间
    pub issued_at: DateTime<Utc>,
}

impl QrTicket {
    pub fn new(parameter: String, image_url: String) -> Self {
        Self {
            parameter,
            image_url,
            issued_at: Utc::now(),
        }
    }

    /// 签发至今的秒数,用于日志
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.issued_at).num_seconds()
    }
}

/// 单次轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrPollStatus {
    /// 尚未扫码确认
    Pending,

    /// 登录成功,票据已消费
    Success,

    /// 二维码过期,票据已失效
    Expired,
}

impl QrPollStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, QrPollStatus::Pending)
    }
}

/// 扫码登录流程的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrLoginOutcome {
    /// 登录成功,账号信息已刷新
    Authenticated,

    /// 调用方取消了轮询,票据仍然有效 (AwaitingQr)
    Abandoned,
}

/// 认证状态 (派生自账号信息与票据,不单独存储)
///
/// ```text
/// Anonymous --request_qr_ticket--> AwaitingQr --Success--> Authenticated
///     ^                                                          |
///     +------------------------- logout -------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    AwaitingQr,
    Authenticated,
}
