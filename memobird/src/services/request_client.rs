use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Url};
use std::time::Duration;

use crate::models::{ApiError, CookieJarHandle, Envelope};
use crate::services::cookie_codec::CookieCodec;

/// 请求客户端
///
/// GET / POST / multipart上传三个原语,每次调用:
/// 1. 附带jar中匹配的 `Cookie` 头
/// 2. 收到响应头后立即把 `Set-Cookie` 合并回jar (无论业务结果如何)
/// 3. 把响应体解析为接口外壳
///
/// 服务端几乎每次调用都会轮换会话cookie,第2步保证jar不会落后于服务端。
/// HTTP状态码不参与判断,以外壳中的 `code` 为准。
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: Client,
    jar: CookieJarHandle,
}

impl RequestClient {
    /// 创建新的请求客户端
    ///
    /// # 参数
    /// - `jar`: 与会话共享的cookie jar
    /// - `timeout`: 单次请求超时
    pub fn new(jar: CookieJarHandle, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::TransportInit(e.to_string()))?;
        Ok(Self { http, jar })
    }

    pub fn jar(&self) -> &CookieJarHandle {
        &self.jar
    }

    /// GET请求,参数放在查询串中
    pub async fn get(&self, url: &Url, params: &[(&str, &str)]) -> Result<Envelope, ApiError> {
        let builder = self.http.get(url.clone()).query(params);
        self.execute(builder, url).await
    }

    /// POST请求,表单编码
    pub async fn post(&self, url: &Url, form: &[(&str, &str)]) -> Result<Envelope, ApiError> {
        let builder = self.http.post(url.clone()).form(form);
        self.execute(builder, url).await
    }

    /// multipart上传,`params` 放在查询串中
    pub async fn upload_multipart(
        &self,
        url: &Url,
        params: &[(&str, &str)],
        form: Form,
    ) -> Result<Envelope, ApiError> {
        let builder = self.http.post(url.clone()).query(params).multipart(form);
        self.execute(builder, url).await
    }

    async fn execute(&self, mut builder: RequestBuilder, url: &Url) -> Result<Envelope, ApiError> {
        if let Some(header) = self.jar.lock().await.cookie_header(url) {
            builder = builder.header(COOKIE, header);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        let response_url = response.url().clone();
        {
            let mut jar = self.jar.lock().await;
            let merged = CookieCodec::merge_set_cookie_headers(
                &mut jar,
                response.headers().get_all(SET_COOKIE),
                &response_url,
            );
            if merged > 0 {
                tracing::debug!(url = %response_url, merged, "Session cookies updated");
            }
        }

        let body = response.text().await?;
        let envelope = Envelope::parse(&body).map_err(|e| {
            tracing::error!(
                url = %response_url,
                status = %status,
                error = %e,
                "Failed to decode response envelope"
            );
            e
        })?;

        tracing::trace!(url = %response_url, code = envelope.code(), "Response decoded");
        Ok(envelope)
    }
}
