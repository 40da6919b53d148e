//! 会话存储
//!
//! 职责: 持有传输层与cookie jar,负责会话快照的加载与保存
//! 策略: 同一时刻最多一个活跃的传输层 - 重新打开时先释放旧的

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{ApiError, CookieJar, CookieJarHandle, SessionSnapshot, StorageError};
use crate::services::cookie_codec::CookieCodec;
use crate::services::request_client::RequestClient;

/// 会话存储
///
/// 状态: Closed → Open → Closed,可重复打开,始终使用同一个快照路径。
/// jar只在首次打开时从文件加载,之后在多次打开之间保留在内存中。
pub struct SessionStore {
    /// 快照文件路径
    save_path: PathBuf,

    /// 传输层单次请求超时
    request_timeout: Duration,

    /// 已加载的cookie jar
    jar: Option<CookieJarHandle>,

    /// 当前活跃的传输层 (仅在Open状态存在)
    transport: Option<RequestClient>,
}

impl SessionStore {
    pub fn new(save_path: impl Into<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            save_path: save_path.into(),
            request_timeout,
            jar: None,
            transport: None,
        }
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// 打开会话
    ///
    /// - jar尚未加载时读取快照文件;文件缺失或损坏时使用空jar,不报错
    /// - 先释放旧的传输层,再创建新的
    ///
    /// # 错误
    /// - `ApiError::TransportInit`: HTTP客户端创建失败
    pub async fn open(&mut self) -> Result<&RequestClient, ApiError> {
        let jar = match &self.jar {
            Some(jar) => jar.clone(),
            None => {
                let jar = load_jar(&self.save_path).await.into_handle();
                self.jar = Some(jar.clone());
                jar
            }
        };

        if self.transport.take().is_some() {
            tracing::info!(path = %self.save_path.display(), "Replacing active transport");
        }

        let client = RequestClient::new(jar, self.request_timeout)?;
        Ok(self.transport.insert(client))
    }

    /// 关闭会话
    ///
    /// 释放传输层,并把jar写入快照文件 (先写临时文件再改名)。
    /// 未加载过jar时不写文件。
    ///
    /// # 错误
    /// - `StorageError`: 快照写入失败,传输层已经释放
    pub async fn close(&mut self) -> Result<(), StorageError> {
        if self.transport.take().is_some() {
            tracing::debug!(path = %self.save_path.display(), "Transport released");
        }

        let Some(jar) = &self.jar else {
            return Ok(());
        };

        let snapshot = CookieCodec::to_snapshot(&*jar.lock().await);
        save_snapshot(&self.save_path, &snapshot).await?;

        tracing::info!(
            path = %self.save_path.display(),
            cookies_count = snapshot.cookie_count(),
            "Session snapshot saved"
        );
        Ok(())
    }

    /// 当前活跃的请求客户端
    ///
    /// # 错误
    /// - `ApiError::SessionClosed`: 会话未打开
    pub fn requests(&self) -> Result<&RequestClient, ApiError> {
        self.transport.as_ref().ok_or(ApiError::SessionClosed)
    }

    /// 已加载的cookie jar
    pub fn jar(&self) -> Option<&CookieJarHandle> {
        self.jar.as_ref()
    }
}

/// 读取快照,任何失败都退回空jar
async fn load_jar(path: &Path) -> CookieJar {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No session snapshot, starting with empty jar");
            return CookieJar::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read session snapshot, starting with empty jar");
            return CookieJar::new();
        }
    };

    match SessionSnapshot::from_json_str(&text) {
        Ok(snapshot) => {
            let jar = CookieCodec::from_snapshot(snapshot);
            tracing::info!(
                path = %path.display(),
                cookies = %jar.sample_for_logging(),
                "Session snapshot loaded"
            );
            jar
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt session snapshot, starting with empty jar");
            CookieJar::new()
        }
    }
}

async fn save_snapshot(path: &Path, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
    let bytes = snapshot.to_json_vec()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "session".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
