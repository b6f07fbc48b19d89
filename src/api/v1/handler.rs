use super::boundary::{AuthContext, merge_patch};
use super::cookie::CookieTransport;
use super::error::*;
use crate::application_port::*;
use crate::domain_model::Principal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use warp::http::{HeaderMap, StatusCode};
use warp::reply::Response;
use warp::{self, Reply, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrincipalView {
    pub subject_id: String,
    pub authorities: Vec<String>,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        PrincipalView {
            subject_id: principal.subject_id.to_string(),
            authorities: principal.authorities.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Error envelope rendered in place, for handlers that still owe the client
/// a session patch.
fn error_reply(code: ApiErrorCode) -> impl warp::Reply {
    let status = code.status();
    let message = code.to_string();
    warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()>::err(code, message)),
        status,
    )
}

fn ok_reply<T: Serialize>(data: T) -> impl warp::Reply {
    warp::reply::with_status(warp::reply::json(&ApiResponse::ok(data)), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    authenticator: Arc<dyn Authenticator>,
    session_service: Arc<dyn SessionService>,
    cookies: Arc<CookieTransport>,
) -> Result<Response, warp::Rejection> {
    let input = LoginInput {
        login_id: body.id,
        password: body.password,
    };

    let principal = authenticator
        .authenticate(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let patch = session_service
        .issue(&principal)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    info!(subject = %principal.subject_id, "login succeeded");
    Ok(merge_patch(
        ok_reply(PrincipalView::from(&principal)),
        &patch,
        &cookies,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub id: String,
    pub password: String,
}

pub async fn signup(
    body: SignupRequest,
    authenticator: Arc<dyn Authenticator>,
) -> Result<Response, warp::Rejection> {
    let input = SignupInput {
        login_id: body.id,
        password: body.password,
    };

    let principal = match authenticator.signup(input).await {
        Ok(principal) => principal,
        Err(SessionError::InvalidInput(reason)) => {
            let json = warp::reply::json(&ApiResponse::<()>::err(ApiErrorCode::BadRequest, reason));
            return Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST).into_response());
        }
        Err(e) => return Err(reject::custom(ApiErrorCode::from(e))),
    };

    info!(subject = %principal.subject_id, "signup succeeded");
    Ok(ok_reply(PrincipalView::from(&principal)).into_response())
}

pub async fn refresh(
    headers: HeaderMap,
    session_service: Arc<dyn SessionService>,
    cookies: Arc<CookieTransport>,
) -> Result<Response, warp::Rejection> {
    let presented = cookies.read(&headers);
    let patch = session_service
        .rotate(presented.as_ref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(merge_patch(ok_reply(()), &patch, &cookies))
}

pub async fn logout(
    headers: HeaderMap,
    session_service: Arc<dyn SessionService>,
    cookies: Arc<CookieTransport>,
) -> Result<Response, warp::Rejection> {
    let presented = cookies.read(&headers);
    let patch = session_service.logout(presented.as_ref()).await;
    Ok(merge_patch(ok_reply(()), &patch, &cookies))
}

pub async fn me(
    ctx: AuthContext,
    cookies: Arc<CookieTransport>,
) -> Result<Response, warp::Rejection> {
    let response = match ctx.require() {
        Ok(principal) => {
            let view = PrincipalView::from(principal);
            merge_patch(ok_reply(view), ctx.patch(), &cookies)
        }
        Err(code) => merge_patch(error_reply(code), ctx.patch(), &cookies),
    };
    Ok(response)
}

pub async fn validate(
    ctx: AuthContext,
    cookies: Arc<CookieTransport>,
) -> Result<Response, warp::Rejection> {
    let response = match ctx.require() {
        Ok(_) => {
            let body = ValidateResponse { valid: true };
            merge_patch(ok_reply(body), ctx.patch(), &cookies)
        }
        Err(code) => merge_patch(error_reply(code), ctx.patch(), &cookies),
    };
    Ok(response)
}
