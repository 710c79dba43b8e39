use crate::e2e::helpers;

use helpers::fake_backend::{INITIAL_REFRESH_TOKEN, VALID_ACCESS_TOKEN};
use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clear_both_credential_cookies_on_logout(ctx: &TestContext) {
    let cookie = format!(
        "accessToken={}; refreshToken={}",
        VALID_ACCESS_TOKEN, INITIAL_REFRESH_TOKEN
    );

    let response = ctx
        .client
        .post_empty_with_cookies("/api/session/logout", &cookie)
        .await
        .unwrap();

    response.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(response.set_cookies.len(), 2);
    for cleared in &response.set_cookies {
        assert!(cleared.contains("=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0"));
    }
    assert!(response.cookie("accessToken").is_some());
    assert!(response.cookie("refreshToken").is_some());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_call_backend_on_logout(ctx: &TestContext) {
    let response = ctx
        .client
        .post_empty_with_cookies("/api/session/logout", "accessToken=whatever")
        .await
        .unwrap();

    response.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(ctx.backend.refresh_calls(), 0);
    assert!(ctx.backend.authorizations().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_get_on_logout(ctx: &TestContext) {
    let response = ctx.client.get("/api/session/logout").await.unwrap();

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
