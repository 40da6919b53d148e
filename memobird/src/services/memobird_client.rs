use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::models::{
    AccountInfo, ApiError, AppError, AuthState, ClientConfig, ConfigError, Device, Paper,
    QrLoginOutcome, QrPollStatus, QrTicket, StorageError,
};
use crate::services::auth_service::AuthService;
use crate::services::print_service::PrintService;
use crate::services::session_store::SessionStore;
use crate::services::upload_service::UploadService;

/// 咕咕机客户端
///
/// 一个实例对应一个会话快照文件和一个登录身份,不支持并发的认证流程。
///
/// ```no_run
/// use memobird::{ClientConfig, MemobirdClient};
///
/// # async fn demo() -> Result<(), memobird::AppError> {
/// let mut client = MemobirdClient::new(ClientConfig::from_env()?)?;
/// client
///     .with_session(|c| {
///         Box::pin(async move {
///             if c.is_logged_in() {
///                 c.print_html("<p>hello</p>", 0).await?;
///             }
///             Ok(())
///         })
///     })
///     .await
/// # }
/// ```
pub struct MemobirdClient {
    config: ClientConfig,
    session: SessionStore,
    auth: AuthService,
    print: PrintService,
    upload: UploadService,
}

impl MemobirdClient {
    /// 创建客户端 (不发起任何请求)
    ///
    /// # 错误
    /// - `ConfigError::InvalidUrl`: 接口地址无效
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let endpoints = config.endpoints()?;
        let session = SessionStore::new(config.session_path.clone(), config.request_timeout);
        let auth = AuthService::new(endpoints.interface.clone(), config.qr_poll_interval);
        let print = PrintService::new(endpoints.interface);
        let upload = UploadService::new(endpoints.upload);

        tracing::info!(
            session_path = %config.session_path.display(),
            interface_url = %config.interface_url,
            "Memobird client initialized"
        );

        Ok(Self {
            config,
            session,
            auth,
            print,
            upload,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_path(&self) -> &Path {
        self.session.save_path()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// 打开会话并刷新账号信息
    ///
    /// 快照缺失或损坏不是错误;刷新失败 (传输/协议错误) 时会话保持打开。
    pub async fn open(&mut self) -> Result<(), AppError> {
        let requests = self.session.open().await?;
        self.auth.refresh_info(requests).await?;
        tracing::info!(state = ?self.auth.state(), "Session opened");
        Ok(())
    }

    /// 关闭会话并保存cookie
    pub async fn close(&mut self) -> Result<(), StorageError> {
        self.session.close().await
    }

    /// 在打开的会话中执行 `f`,结束后无论成功、失败还是panic都关闭一次
    ///
    /// `f` 返回错误时,关闭失败只记录日志,返回 `f` 的错误;
    /// `f` 成功而关闭失败时返回关闭的错误。panic会在关闭后继续传播。
    pub async fn with_session<T, F>(&mut self, f: F) -> Result<T, AppError>
    where
        F: for<'c> FnOnce(&'c mut MemobirdClient) -> BoxFuture<'c, Result<T, AppError>>,
    {
        if let Err(e) = self.open().await {
            if let Err(close_err) = self.close().await {
                tracing::error!(error = %close_err, "Failed to persist session after open failure");
            }
            return Err(e);
        }

        let result = AssertUnwindSafe(f(&mut *self)).catch_unwind().await;
        let closed = self.close().await;

        match result {
            Err(panic) => {
                if let Err(close_err) = closed {
                    tracing::error!(error = %close_err, "Failed to persist session during panic");
                }
                std::panic::resume_unwind(panic)
            }
            Ok(Ok(value)) => {
                closed?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(close_err) = closed {
                    tracing::error!(error = %close_err, "Failed to persist session after error");
                }
                Err(e)
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn account(&self) -> &AccountInfo {
        self.auth.account()
    }

    pub fn devices(&self) -> &[Device] {
        &self.auth.account().devices
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn qr_ticket(&self) -> Option<&QrTicket> {
        self.auth.qr_ticket()
    }

    pub async fn refresh_info(&mut self) -> Result<bool, ApiError> {
        let requests = self.session.requests()?;
        self.auth.refresh_info(requests).await
    }

    /// 密码登录
    pub async fn login(&mut self, identifier: &str, secret: &str) -> Result<bool, ApiError> {
        let requests = self.session.requests()?;
        self.auth
            .login_with_password(requests, identifier, secret)
            .await
    }

    pub async fn request_qr_ticket(&mut self) -> Result<String, ApiError> {
        let requests = self.session.requests()?;
        self.auth.request_qr_ticket(requests).await
    }

    pub async fn poll_qr_ticket(&mut self) -> Result<QrPollStatus, ApiError> {
        let requests = self.session.requests()?;
        self.auth.poll_qr_ticket(requests).await
    }

    /// 扫码登录,见 [`AuthService::login_with_qr`]
    pub async fn login_with_qr<F>(
        &mut self,
        cancel: &CancellationToken,
        on_ticket: F,
    ) -> Result<QrLoginOutcome, ApiError>
    where
        F: FnMut(&str),
    {
        let requests = self.session.requests()?;
        self.auth.login_with_qr(requests, cancel, on_ticket).await
    }

    pub async fn logout(&mut self) -> Result<bool, ApiError> {
        let requests = self.session.requests()?;
        self.auth.logout(requests).await
    }

    /// 打印HTML到第 `device_index` 台设备
    pub async fn print_html(&self, html: &str, device_index: usize) -> Result<bool, ApiError> {
        let requests = self.session.requests()?;
        self.print
            .print_html(requests, self.auth.account(), html, device_index)
            .await
    }

    pub async fn print_paper(&self, paper: &Paper, device_index: usize) -> Result<bool, ApiError> {
        let requests = self.session.requests()?;
        self.print
            .print_paper(requests, self.auth.account(), paper, device_index)
            .await
    }

    /// 上传图片,返回可用于纸条的地址
    pub async fn upload_image(&self, path: impl AsRef<Path>) -> Result<Option<String>, AppError> {
        let requests = self.session.requests()?;
        self.upload.upload_image(requests, path.as_ref()).await
    }
}
