//! 测试公共模块
//!
//! 用wiremock模拟咕咕机服务端,每个测试一个独立的MockServer和临时会话目录。

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use memobird::ClientConfig;

pub const INTERFACE_PATH: &str = "/cn/ashx/DBInterface.ashx";
pub const UPLOAD_PATH: &str = "/cn/Plug-in/ueditor/net/controller.ashx";

/// 合法的登录用户ID (长度 > 8)
pub const USER_ID: &str = "123456789";
pub const USER_NAME: &str = "咕咕";
pub const DEVICE_GUID: &str = "g-1";

/// 测试环境: 模拟服务端 + 临时会话目录
pub struct TestEnv {
    pub server: MockServer,
    pub dir: TempDir,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: tempfile::tempdir().expect("临时目录创建失败"),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.path().join("memobird.json")
    }

    /// 指向模拟服务端的配置,轮询间隔缩短到10ms
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_session_path(self.session_path())
            .with_interface_url(format!("{}{}", self.server.uri(), INTERFACE_PATH))
            .with_upload_url(format!("{}{}", self.server.uri(), UPLOAD_PATH))
            .with_request_timeout(Duration::from_secs(2))
            .with_qr_poll_interval(Duration::from_millis(10))
    }

    pub fn snapshot_text(&self) -> String {
        std::fs::read_to_string(self.session_path()).expect("会话文件不存在")
    }

    /// 已接收请求中,POST表单包含 `fragment` 的数量
    pub async fn count_bodies_containing(&self, fragment: &str) -> usize {
        self.received()
            .await
            .iter()
            .filter(|r| String::from_utf8_lossy(&r.body).contains(fragment))
            .count()
    }

    /// 已接收请求中,查询串 `DataType` 等于 `data_type` 的数量
    pub async fn count_queries(&self, data_type: &str) -> usize {
        self.received()
            .await
            .iter()
            .filter(|r| {
                r.url
                    .query_pairs()
                    .any(|(k, v)| k == "DataType" && v == data_type)
            })
            .count()
    }

    async fn received(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// `LoginWeb`: 携带 `cookie` 时返回已登录账号 (最多 `times` 次,None表示不限)
    pub async fn mount_login_web_for_cookie(&self, cookie: &str, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(INTERFACE_PATH))
            .and(query_param("DataType", "LoginWeb"))
            .and(header("cookie", cookie))
            .respond_with(json_response(account_body()));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// `LoginWeb`: 其余情况返回 code 0
    pub async fn mount_login_web_anonymous(&self) {
        Mock::given(method("GET"))
            .and(path(INTERFACE_PATH))
            .and(query_param("DataType", "LoginWeb"))
            .respond_with(json_response(json!({ "code": 0, "msg": "未登录" })))
            .mount(&self.server)
            .await;
    }

    /// `webLogin`: 接受凭据并下发会话cookie
    pub async fn mount_password_login(&self, set_cookie: &str) {
        Mock::given(method("POST"))
            .and(path(INTERFACE_PATH))
            .and(body_string_contains("DataType=webLogin"))
            .respond_with(
                json_response(json!({ "code": 1 })).insert_header("Set-Cookie", set_cookie),
            )
            .mount(&self.server)
            .await;
    }

    /// 任意POST表单操作的单次/多次响应
    pub async fn mount_post(&self, fragments: &[&str], body: Value, times: Option<u64>) {
        let mut mock = Mock::given(method("POST")).and(path(INTERFACE_PATH));
        for fragment in fragments {
            mock = mock.and(body_string_contains(*fragment));
        }
        let mock = mock.respond_with(json_response(body));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    pub async fn mount_post_response(&self, fragments: &[&str], response: ResponseTemplate) {
        let mut mock = Mock::given(method("POST")).and(path(INTERFACE_PATH));
        for fragment in fragments {
            mock = mock.and(body_string_contains(*fragment));
        }
        mock.respond_with(response).mount(&self.server).await;
    }

    pub async fn mount_get(&self, data_type: &str, body: Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(INTERFACE_PATH))
            .and(query_param("DataType", data_type))
            .respond_with(json_response(body));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }
}

pub fn json_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn account_body() -> Value {
    json!({
        "code": 1,
        "userId": USER_ID,
        "userName": USER_NAME,
        "smartCores": [
            { "smartName": "书桌", "smartGuid": DEVICE_GUID },
            { "smartName": "厨房", "smartGuid": "g-2" }
        ]
    })
}
