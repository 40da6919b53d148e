//! 打印与上传集成测试

mod common;

use common::*;
use memobird::{AppError, MemobirdClient, Paper};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::Mock;

async fn logged_in_client(env: &TestEnv) -> MemobirdClient {
    env.mount_login_web_for_cookie("sid=pw", None).await;
    env.mount_login_web_anonymous().await;
    env.mount_password_login("sid=pw; path=/").await;

    let mut client = MemobirdClient::new(env.config()).unwrap();
    client.open().await.unwrap();
    assert!(client.login("13800000000", "secret").await.unwrap());
    client
}

#[tokio::test]
async fn test_print_paper_to_first_device() {
    let env = TestEnv::start().await;
    env.mount_post(
        &[
            "DataType=PrintPaper",
            "toUserName=%E6%88%91",
            "toUserId=123456789",
            "guidList=g-1",
            "printContent=",
        ],
        json!({ "code": 1 }),
        None,
    )
    .await;

    let client = logged_in_client(&env).await;
    let mut paper = Paper::default();
    paper.append_text("hello");

    assert!(client.print_paper(&paper, 0).await.unwrap());
    assert_eq!(env.count_bodies_containing("_paper_text_").await, 1);
}

#[tokio::test]
async fn test_print_to_second_device_uses_its_guid() {
    let env = TestEnv::start().await;
    env.mount_post(&["DataType=PrintPaper", "guidList=g-2"], json!({ "code": 1 }), None)
        .await;
    env.mount_post(&["DataType=PrintPaper"], json!({ "code": 0 }), None)
        .await;

    let client = logged_in_client(&env).await;
    assert!(client.print_html("<p>b</p>", 1).await.unwrap());
    assert!(!client.print_html("<p>b</p>", 0).await.unwrap());
}

#[tokio::test]
async fn test_print_out_of_range_sends_nothing() {
    let env = TestEnv::start().await;
    env.mount_post(&["DataType=PrintPaper"], json!({ "code": 1 }), None)
        .await;

    let client = logged_in_client(&env).await;
    assert!(!client.print_html("<p>x</p>", 2).await.unwrap());
    assert_eq!(env.count_bodies_containing("DataType=PrintPaper").await, 0);
}

#[tokio::test]
async fn test_upload_image_resolves_url() {
    let env = TestEnv::start().await;
    env.mount_login_web_anonymous().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(query_param("action", "uploadimage"))
        .and(body_string_contains("name=\"upfile\""))
        .and(body_string_contains("filename=\"photo.png\""))
        .respond_with(json_response(json!({
            "state": "SUCCESS",
            "url": "/upload/image/20261017/photo.png"
        })))
        .mount(&env.server)
        .await;

    let image = env.dir.path().join("photo.png");
    std::fs::write(&image, b"fake png bytes").unwrap();

    let mut client = MemobirdClient::new(env.config()).unwrap();
    client.open().await.unwrap();
    let url = client.upload_image(&image).await.unwrap();

    assert_eq!(
        url,
        Some(format!("{}/cn/upload/image/20261017/photo.png", env.server.uri()))
    );
}

#[tokio::test]
async fn test_upload_without_url_is_none() {
    let env = TestEnv::start().await;
    env.mount_login_web_anonymous().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(json_response(json!({ "state": "ERROR", "url": "" })))
        .mount(&env.server)
        .await;

    let image = env.dir.path().join("photo.png");
    std::fs::write(&image, b"fake png bytes").unwrap();

    let mut client = MemobirdClient::new(env.config()).unwrap();
    client.open().await.unwrap();
    assert_eq!(client.upload_image(&image).await.unwrap(), None);
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let env = TestEnv::start().await;
    env.mount_login_web_anonymous().await;

    let mut client = MemobirdClient::new(env.config()).unwrap();
    client.open().await.unwrap();
    let result = client.upload_image(env.dir.path().join("missing.png")).await;
    assert!(matches!(result, Err(AppError::Io(_))));
}
