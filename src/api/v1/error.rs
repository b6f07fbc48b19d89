use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        )
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid id or password")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Login id already taken")]
    LoginIdTaken,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::LoginIdTaken | ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            SessionError::LoginIdTaken => ApiErrorCode::LoginIdTaken,
            SessionError::InvalidInput(_) => ApiErrorCode::BadRequest,
            SessionError::RefreshAbsent
            | SessionError::Token(_)
            | SessionError::ReuseDetected => ApiErrorCode::InvalidToken,
            // fail closed: an unreachable store never authenticates anyone
            SessionError::StoreUnavailable(e) => {
                warn!("session store unavailable: {}", e);
                ApiErrorCode::Unauthorized
            }
            SessionError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
