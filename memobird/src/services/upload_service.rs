use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::path::Path;

use crate::log_event;
use crate::models::{ApiError, AppError};
use crate::services::request_client::RequestClient;

/// 图片上传服务
///
/// 上传到编辑器插件接口,返回设备可以访问的图片地址,用于 [`crate::models::ImageItem`]。
pub struct UploadService {
    upload_url: Url,
}

impl UploadService {
    pub fn new(upload_url: Url) -> Self {
        Self { upload_url }
    }

    /// 上传图片
    ///
    /// # 返回值
    /// - `Some(url)`: 图片的绝对地址
    /// - `None`: 服务端没有返回地址
    ///
    /// # 错误
    /// - `AppError::Io`: 读取本地文件失败
    /// - `AppError::Api`: 传输或协议错误
    pub async fn upload_image(
        &self,
        requests: &RequestClient,
        path: &Path,
    ) -> Result<Option<String>, AppError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let size = bytes.len();
        let form = Form::new().part("upfile", Part::bytes(bytes).file_name(file_name.clone()));

        let envelope = requests
            .upload_multipart(&self.upload_url, &[("action", "uploadimage")], form)
            .await?;

        let relative = envelope.str_field("url").unwrap_or_default();
        if relative.is_empty() {
            tracing::warn!(file = %file_name, "Upload returned no url");
            return Ok(None);
        }

        let absolute = self
            .upload_url
            .join(&format!("/cn{}", relative))
            .map_err(|e| ApiError::InvalidResponse(format!("图片地址无效 {}: {}", relative, e)))?
            .to_string();

        log_event!(
            "ImageUploaded",
            file = file_name.as_str(),
            size = size,
            url = absolute.as_str(),
        );
        Ok(Some(absolute))
    }
}
