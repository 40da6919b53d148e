use reqwest::Url;

use crate::log_event;
use crate::models::{AccountInfo, ApiError, Paper};
use crate::services::request_client::RequestClient;

/// 服务端要求的收件人显示名
const TO_USER_NAME: &str = "我";

/// 打印服务
///
/// 把纸条HTML发送到账号绑定的某台设备。
pub struct PrintService {
    interface_url: Url,
}

impl PrintService {
    pub fn new(interface_url: Url) -> Self {
        Self { interface_url }
    }

    /// 打印HTML
    ///
    /// # 参数
    /// - `account`: 当前账号信息,提供发件人和设备列表
    /// - `html`: 纸条内容
    /// - `device_index`: 设备在账号设备列表中的序号
    ///
    /// # 返回值
    /// - `false`: 设备序号越界 (不发请求) 或服务端拒绝
    /// - `true`: `code == 1`
    pub async fn print_html(
        &self,
        requests: &RequestClient,
        account: &AccountInfo,
        html: &str,
        device_index: usize,
    ) -> Result<bool, ApiError> {
        let Some(device) = account.device(device_index) else {
            tracing::warn!(
                device_index,
                devices = account.devices.len(),
                "Device index out of range, nothing printed"
            );
            return Ok(false);
        };

        let envelope = requests
            .post(
                &self.interface_url,
                &[
                    ("DataType", "PrintPaper"),
                    ("fromUserName", account.user_name.as_str()),
                    ("toUserName", TO_USER_NAME),
                    ("toUserId", account.user_id.as_str()),
                    ("guidList", device.guid.as_str()),
                    ("printContent", html),
                ],
            )
            .await?;

        let printed = envelope.is_success();
        if printed {
            log_event!(
                "PaperPrinted",
                device = device.name.as_str(),
                content_len = html.len(),
            );
        } else {
            tracing::warn!(code = envelope.code(), device = %device.name, "Print request rejected");
        }
        Ok(printed)
    }

    /// 打印纸条
    pub async fn print_paper(
        &self,
        requests: &RequestClient,
        account: &AccountInfo,
        paper: &Paper,
        device_index: usize,
    ) -> Result<bool, ApiError> {
        self.print_html(requests, account, &paper.html(), device_index)
            .await
    }
}
