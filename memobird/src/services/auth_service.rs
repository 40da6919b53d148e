use reqwest::Url;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::account::LoginWebPayload;
use crate::models::{
    AccountInfo, ApiError, AuthState, QrFlowStep, QrLoginFlow, QrLoginOutcome, QrPollStatus,
    QrTicket,
};
use crate::services::request_client::RequestClient;
use crate::{log_error, log_event};

/// 认证服务
///
/// 职责:
/// - 账号信息刷新 (`LoginWeb`)
/// - 密码登录 (`webLogin`)
/// - 扫码登录: 申请二维码、单次轮询、完整的自动续期流程
/// - 注销 (`QuitWeb`)
///
/// 认证状态不单独存储,由账号信息和当前票据推导,见 [`AuthService::state`]。
pub struct AuthService {
    interface_url: Url,
    poll_interval: Duration,
    account: AccountInfo,
    qr_ticket: Option<QrTicket>,
}

impl AuthService {
    /// 创建认证服务
    ///
    /// # 参数
    /// - `interface_url`: 数据接口地址
    /// - `poll_interval`: 扫码登录的轮询间隔
    pub fn new(interface_url: Url, poll_interval: Duration) -> Self {
        Self {
            interface_url,
            poll_interval,
            account: AccountInfo::default(),
            qr_ticket: None,
        }
    }

    pub fn account(&self) -> &AccountInfo {
        &self.account
    }

    pub fn qr_ticket(&self) -> Option<&QrTicket> {
        self.qr_ticket.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_authenticated()
    }

    pub fn state(&self) -> AuthState {
        if self.account.is_authenticated() {
            AuthState::Authenticated
        } else if self.qr_ticket.is_some() {
            AuthState::AwaitingQr
        } else {
            AuthState::Anonymous
        }
    }

    /// 刷新账号信息
    ///
    /// `code != 1` 时保留原有信息,服务端的临时错误不会把用户"登出"。
    ///
    /// # 返回值
    /// 账号信息是否被覆盖
    ///
    /// # 错误
    /// - 传输或协议错误
    /// - `ApiError::InvalidResponse`: `code == 1` 但缺少账号字段
    pub async fn refresh_info(&mut self, requests: &RequestClient) -> Result<bool, ApiError> {
        let envelope = requests
            .get(&self.interface_url, &[("DataType", "LoginWeb")])
            .await?;

        if !envelope.is_success() {
            tracing::debug!(code = envelope.code(), "Account info unchanged");
            return Ok(false);
        }

        let payload: LoginWebPayload = envelope.decode()?;
        self.account = AccountInfo::from(payload);

        log_event!(
            "AccountRefreshed",
            user_id = self.account.user_id.as_str(),
            devices = self.account.devices.len(),
            authenticated = self.account.is_authenticated(),
        );
        Ok(true)
    }

    /// 密码登录
    ///
    /// # 返回值
    /// `true` 表示服务端接受了凭据 (随后已刷新账号信息)
    pub async fn login_with_password(
        &mut self,
        requests: &RequestClient,
        identifier: &str,
        secret: &str,
    ) -> Result<bool, ApiError> {
        let envelope = requests
            .post(
                &self.interface_url,
                &[
                    ("DataType", "webLogin"),
                    ("userCode", identifier),
                    ("strUserPwd", secret),
                ],
            )
            .await?;

        if !envelope.is_success() {
            tracing::warn!(code = envelope.code(), "Password login rejected");
            return Ok(false);
        }

        self.refresh_info(requests).await?;
        log_event!("PasswordLoginSucceeded", user_id = self.account.user_id.as_str());
        Ok(true)
    }

    /// 申请新的二维码票据
    ///
    /// 新票据替换旧票据。
    ///
    /// # 返回值
    /// 二维码图片的绝对地址
    pub async fn request_qr_ticket(&mut self, requests: &RequestClient) -> Result<String, ApiError> {
        let envelope = requests
            .post(
                &self.interface_url,
                &[("DataType", "getScanCode"), ("parameter", "")],
            )
            .await?;

        let parameter = envelope.require_str("parameter")?;
        let relative = envelope.require_str("url")?;
        let image_url = self
            .interface_url
            .join(&relative)
            .map_err(|e| ApiError::InvalidResponse(format!("二维码地址无效 {}: {}", relative, e)))?
            .to_string();

        log_event!(
            "QrCodeGenerated",
            qr_parameter = parameter.as_str(),
            image_url = image_url.as_str(),
        );

        self.qr_ticket = Some(QrTicket::new(parameter, image_url.clone()));
        Ok(image_url)
    }

    /// 对当前票据轮询一次
    ///
    /// `auth == 1` 优先于 `expire == 1`;两种终态都会使票据失效。
    ///
    /// # 错误
    /// - `ApiError::NoQrTicket`: 没有有效票据
    pub async fn poll_qr_ticket(&mut self, requests: &RequestClient) -> Result<QrPollStatus, ApiError> {
        let ticket = self.qr_ticket.as_ref().ok_or(ApiError::NoQrTicket)?;

        let envelope = requests
            .post(
                &self.interface_url,
                &[
                    ("DataType", "verifyWebQRCode"),
                    ("parameter", ticket.parameter.as_str()),
                ],
            )
            .await?;

        let status = if envelope.int_field("auth") == 1 {
            QrPollStatus::Success
        } else if envelope.int_field("expire") == 1 {
            QrPollStatus::Expired
        } else {
            QrPollStatus::Pending
        };

        tracing::debug!(
            qr_parameter = %ticket.parameter,
            age_seconds = ticket.age_seconds(),
            status = ?status,
            "QR ticket polled"
        );

        if status.is_terminal() {
            self.qr_ticket = None;
        }
        Ok(status)
    }

    /// 完整的扫码登录流程
    ///
    /// 申请二维码后按固定间隔轮询;过期时自动申请新二维码并通过 `on_ticket`
    /// 再次交给调用方;成功后刷新账号信息。
    ///
    /// # 参数
    /// - `cancel`: 取消令牌,取消后返回 `Abandoned`,票据保持有效
    ///   (票据刚过期时先签发新票据再放弃)
    /// - `on_ticket`: 每次签发新二维码时回调,参数为图片地址
    ///
    /// # 错误
    /// 传输或协议错误直接返回,不重试
    pub async fn login_with_qr<F>(
        &mut self,
        requests: &RequestClient,
        cancel: &CancellationToken,
        mut on_ticket: F,
    ) -> Result<QrLoginOutcome, ApiError>
    where
        F: FnMut(&str),
    {
        let mut flow = QrLoginFlow::new(self.poll_interval);
        // 过期后到新票据签发前不响应取消,保证放弃时仍有可用票据
        let mut renewing = false;

        loop {
            if cancel.is_cancelled() && !renewing {
                return Ok(self.abandon(&flow));
            }

            match flow.next_step() {
                QrFlowStep::RequestTicket => {
                    let image_url = self.request_qr_ticket(requests).await.map_err(|e| {
                        log_error!("QrCodeRequestFailed", error = tracing::field::display(&e));
                        e
                    })?;
                    flow.ticket_issued();
                    renewing = false;
                    on_ticket(&image_url);
                }
                QrFlowStep::Wait(interval) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(self.abandon(&flow)),
                        _ = tokio::time::sleep(interval) => flow.waited(),
                    }
                }
                QrFlowStep::Poll => {
                    let status = self.poll_qr_ticket(requests).await.map_err(|e| {
                        log_error!("PollingFailed", error = tracing::field::display(&e));
                        e
                    })?;
                    if status == QrPollStatus::Expired {
                        log_event!("QrCodeExpired", tickets_issued = flow.tickets_issued());
                        renewing = true;
                    }
                    flow.observe(status);
                }
                QrFlowStep::Finish => {
                    self.refresh_info(requests).await?;
                    if !self.account.is_authenticated() {
                        tracing::warn!(
                            user_id = self.account.user_id.as_str(),
                            "QR scan confirmed but refreshed account is not logged in"
                        );
                    }
                    log_event!(
                        "QrLoginSucceeded",
                        user_id = self.account.user_id.as_str(),
                        tickets_issued = flow.tickets_issued(),
                        polls = flow.polls(),
                    );
                    return Ok(QrLoginOutcome::Authenticated);
                }
            }
        }
    }

    fn abandon(&self, flow: &QrLoginFlow) -> QrLoginOutcome {
        log_event!(
            "QrLoginAbandoned",
            tickets_issued = flow.tickets_issued(),
            polls = flow.polls(),
            ticket_live = self.qr_ticket.is_some(),
        );
        QrLoginOutcome::Abandoned
    }

    /// 注销
    ///
    /// 只有服务端确认 (`code == 1`) 才清空账号信息与票据。
    pub async fn logout(&mut self, requests: &RequestClient) -> Result<bool, ApiError> {
        let envelope = requests
            .get(&self.interface_url, &[("DataType", "QuitWeb")])
            .await?;

        if !envelope.is_success() {
            tracing::warn!(code = envelope.code(), "Logout rejected, state unchanged");
            return Ok(false);
        }

        log_event!("LoggedOut", user_id = self.account.user_id.as_str());
        self.account.clear();
        self.qr_ticket = None;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CookieJar, Device};

    fn service() -> AuthService {
        let url = Url::parse("http://127.0.0.1:9/cn/ashx/DBInterface.ashx").unwrap();
        AuthService::new(url, Duration::from_millis(10))
    }

    fn offline_client() -> RequestClient {
        RequestClient::new(CookieJar::new().into_handle(), Duration::from_millis(200)).unwrap()
    }

    #[test]
    fn test_state_is_derived() {
        let mut auth = service();
        assert_eq!(auth.state(), AuthState::Anonymous);

        auth.qr_ticket = Some(QrTicket::new("T1".into(), "http://x/qr.png".into()));
        assert_eq!(auth.state(), AuthState::AwaitingQr);

        auth.account = AccountInfo {
            user_id: "123456789".into(),
            user_name: "咕咕".into(),
            devices: vec![Device {
                name: "desk".into(),
                guid: "g1".into(),
            }],
        };
        assert_eq!(auth.state(), AuthState::Authenticated);

        auth.account.user_id = "12345678".into();
        assert_eq!(auth.state(), AuthState::AwaitingQr);
    }

    #[tokio::test]
    async fn test_poll_without_ticket_fails_before_any_request() {
        let mut auth = service();
        let result = auth.poll_qr_ticket(&offline_client()).await;
        assert!(matches!(result, Err(ApiError::NoQrTicket)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_abandoned() {
        let mut auth = service();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut tickets = Vec::new();
        let outcome = auth
            .login_with_qr(&offline_client(), &cancel, |url| tickets.push(url.to_string()))
            .await
            .unwrap();

        assert_eq!(outcome, QrLoginOutcome::Abandoned);
        assert!(tickets.is_empty());
        assert_eq!(auth.state(), AuthState::Anonymous);
    }
}
