//! 认证处理：会话校验中间件、登录与登出。

use axum::extract::rejection::FormRejection;
use axum::extract::{Extension, Form};
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::response::{Html, IntoResponse, Response};
use axum::{body::Body as AxumBody, middleware};
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AUTH_COOKIE_NAME;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::frontend::render_main_page;
use crate::http::{client_origin, redirect_found};
use crate::session::{SessionCodec, SessionCredentials, TokenError};
use crate::storage::Storage;

/// 认证上下文：凭据存储与会话编解码器。
pub struct AuthContext {
    pub credentials: CredentialStore,
    pub codec: Box<dyn SessionCodec>,
}

impl AuthContext {
    pub fn new(credentials: CredentialStore, codec: Box<dyn SessionCodec>) -> Self {
        Self { credentials, codec }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthDenial {
    #[error("no session cookie")]
    MissingCookie,
    #[error("malformed session token: {0}")]
    MalformedToken(#[from] TokenError),
    #[error("unknown credentials")]
    InvalidCredentials,
}

/// 读取 `auth` Cookie 的原始值（不做百分号解码）。
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// 校验请求中的会话 Cookie，成功时返回用户名。
pub async fn authorize(auth: &AuthContext, headers: &HeaderMap) -> Result<String, AuthDenial> {
    let token = session_token(headers).ok_or(AuthDenial::MissingCookie)?;
    let credentials = auth.codec.decode(&token)?;
    if auth
        .credentials
        .validate(&credentials.username, &credentials.password)
        .await
    {
        Ok(credentials.username)
    } else {
        Err(AuthDenial::InvalidCredentials)
    }
}

/// 认证中间件：受保护路径必须携带有效会话，否则重定向到首页。
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthContext>>,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    if !is_protected_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    match authorize(&auth, req.headers()).await {
        Ok(username) => {
            debug!(username, path = req.uri().path(), "session accepted");
            Ok(next.run(req).await)
        }
        Err(denial) => {
            warn!(
                client_ip = %client_origin(&req),
                path = req.uri().path(),
                reason = %denial,
                "unauthorized access attempt"
            );
            Err(ApiError::Unauthorized)
        }
    }
}

fn is_protected_path(path: &str) -> bool {
    matches!(path, "/upload" | "/files" | "/delete" | "/download")
}

#[derive(Deserialize, Default)]
pub(crate) struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// 首页：未登录显示登录表单，已登录显示文件列表。
pub async fn main_page(
    Extension(auth): Extension<Arc<AuthContext>>,
    Extension(storage): Extension<Arc<Storage>>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let is_authorized = authorize(&auth, &headers).await.is_ok();
    render_page(&storage, is_authorized).await
}

/// 登录表单提交：凭据匹配时写入会话 Cookie 并直接渲染已登录页面。
///
/// 缺失或无法解析的表单按空字段处理。
pub async fn login(
    Extension(auth): Extension<Arc<AuthContext>>,
    Extension(storage): Extension<Arc<Storage>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(error = %rejection, "login form unreadable");
            LoginForm::default()
        }
    };
    if !auth.credentials.validate(&form.username, &form.password).await {
        warn!(username = %form.username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let token = auth
        .codec
        .encode(&SessionCredentials::new(form.username.as_str(), form.password));
    let cookie = Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let set_cookie = set_cookie_header(&cookie)?;
    info!(username = %form.username, "login succeeded");

    let page = render_page(&storage, true).await?;
    Ok(([(header::SET_COOKIE, set_cookie)], page).into_response())
}

/// 登出：立即使 Cookie 过期并回到首页。
pub async fn logout() -> Result<Response, ApiError> {
    let cookie = Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .max_age(CookieDuration::ZERO)
        .build();
    let mut response = redirect_found("/");
    response
        .headers_mut()
        .insert(header::SET_COOKIE, set_cookie_header(&cookie)?);
    Ok(response)
}

/// Cookie 值按原样写出，不做百分号编码。
fn set_cookie_header(cookie: &Cookie<'_>) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_bytes(cookie.to_string().as_bytes())
        .map_err(|_| ApiError::Internal("failed to build session cookie".into()))
}

async fn render_page(storage: &Storage, is_authorized: bool) -> Result<Html<String>, ApiError> {
    let files = if is_authorized {
        storage.list().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to list storage directory");
            Vec::new()
        })
    } else {
        Vec::new()
    };
    render_main_page(is_authorized, &files)
}
