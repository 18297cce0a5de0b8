//! 认证接口：注册、登录、登出、当前用户

use reqwest::Method;
use tracing::{info, warn};
use validator::Validate;

use crate::client::{ApiClient, ApiRequest, RequestOptions};
use crate::error::ApiResult;
use crate::models::auth::{LoginRequest, Me, RegisterRequest, RegisterResponse, Tokens};

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// 凭证接口：不带令牌，401 表示凭证错误而不是会话过期，不触发刷新
    fn credentials() -> RequestOptions {
        RequestOptions::public().without_retry()
    }

    /// 注册账号（不建立会话）
    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<RegisterResponse> {
        req.validate()?;
        self.client
            .send_json(Method::POST, "/api/auth/register", req, Self::credentials())
            .await
    }

    /// 登录并保存访问令牌；刷新令牌 cookie 由 HTTP 客户端保存
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Tokens> {
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        req.validate()?;

        let tokens: Tokens = self
            .client
            .send_json(Method::POST, "/api/auth/login", &req, Self::credentials())
            .await?;

        self.client.session().set_access_token(tokens.access_token.clone());
        info!(email = %req.email, "Logged in");
        Ok(tokens)
    }

    /// 注册后立即登录
    pub async fn sign_up(&self, req: &RegisterRequest) -> ApiResult<(RegisterResponse, Tokens)> {
        let account = self.register(req).await?;
        let tokens = self.login(&req.email, &req.password).await?;
        Ok((account, tokens))
    }

    /// 当前设备登出
    ///
    /// 无论后端调用成败，本地会话都会被清空。
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self
            .client
            .execute("/api/auth/logout", ApiRequest::post(), Self::credentials())
            .await;
        if let Err(e) = &result {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.client.session().clear();
        info!("Logged out");
        result
    }

    /// 所有设备登出；成功后清空本地会话
    pub async fn logout_all(&self) -> ApiResult<()> {
        self.client
            .execute("/api/auth/logout_all", ApiRequest::post(), RequestOptions::default())
            .await?;
        self.client.session().clear();
        info!("Logged out from all sessions");
        Ok(())
    }

    pub async fn me(&self) -> ApiResult<Me> {
        self.client.get("/api/users/me", RequestOptions::default()).await
    }
}
