use super::boundary::with_auth;
use super::handler;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

const MAX_BODY_BYTES: u64 = 4 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::path("auth")
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.authenticator.clone()))
        .and(with(server.session_service.clone()))
        .and(with(server.cookies.clone()))
        .and_then(handler::login);

    let signup = warp::path("auth")
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.authenticator.clone()))
        .and_then(handler::signup);

    let refresh = warp::path("auth")
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::headers_cloned())
        .and(with(server.session_service.clone()))
        .and(with(server.cookies.clone()))
        .and_then(handler::refresh);

    let logout = warp::path("auth")
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::headers_cloned())
        .and(with(server.session_service.clone()))
        .and(with(server.cookies.clone()))
        .and_then(handler::logout);

    let me = warp::path("auth")
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(server.boundary.clone()))
        .and(with(server.cookies.clone()))
        .and_then(handler::me);

    let validate = warp::path("auth")
        .and(warp::path("validate"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(server.boundary.clone()))
        .and(with(server.cookies.clone()))
        .and_then(handler::validate);

    login
        .or(signup)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(validate)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
