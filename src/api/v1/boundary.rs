//! Per-request authentication step.
//!
//! Reads the bearer access token and turns it into an [`AuthContext`]. An
//! expired access token triggers a refresh-token rotation on the spot, so the
//! request is served under the refreshed identity; the new tokens travel in
//! the context's [`SessionPatch`] and are merged into the response by
//! [`merge_patch`]. This step never rejects a request: every failure means
//! "continue unauthenticated" and protected handlers decide via
//! [`AuthContext::require`].

use super::cookie::CookieTransport;
use super::error::ApiErrorCode;
use crate::application_port::*;
use crate::domain_model::Principal;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};
use warp::Filter;
use warp::http::{HeaderMap, HeaderValue, header};
use warp::reply::Response;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    principal: Option<Principal>,
    patch: SessionPatch,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal, patch: SessionPatch) -> Self {
        Self {
            principal: Some(principal),
            patch,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn require(&self) -> Result<&Principal, ApiErrorCode> {
        self.principal.as_ref().ok_or(ApiErrorCode::Unauthorized)
    }

    pub fn patch(&self) -> &SessionPatch {
        &self.patch
    }
}

pub struct AuthBoundary {
    token_codec: Arc<dyn TokenCodec>,
    session_service: Arc<dyn SessionService>,
    cookies: Arc<CookieTransport>,
}

impl AuthBoundary {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        session_service: Arc<dyn SessionService>,
        cookies: Arc<CookieTransport>,
    ) -> Self {
        Self {
            token_codec,
            session_service,
            cookies,
        }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> AuthContext {
        let Some(token) = bearer_token(headers) else {
            return AuthContext::anonymous();
        };

        match self.token_codec.parse_and_verify(token) {
            Ok(principal) => AuthContext::authenticated(principal, SessionPatch::default()),
            Err(TokenError::Expired) => self.rotate(headers).await,
            Err(e) => {
                debug!(error = %e, "access token rejected");
                AuthContext::anonymous()
            }
        }
    }

    async fn rotate(&self, headers: &HeaderMap) -> AuthContext {
        let presented = self.cookies.read(headers);
        let patch = match self.session_service.rotate(presented.as_ref()).await {
            Ok(patch) => patch,
            Err(e) => {
                debug!(error = %e, "rotation failed, continuing unauthenticated");
                return AuthContext::anonymous();
            }
        };

        let rotated = patch
            .access_token
            .as_ref()
            .map(|t| self.token_codec.parse_and_verify(&t.0));
        match rotated {
            Some(Ok(principal)) => {
                debug!(subject = %principal.subject_id, "access token refreshed in-flight");
                AuthContext::authenticated(principal, patch)
            }
            _ => {
                // the store already holds the new refresh token, so the client
                // still needs the patch even though this request stays anonymous
                warn!("freshly rotated access token failed verification");
                AuthContext {
                    principal: None,
                    patch,
                }
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn with_auth(
    boundary: Arc<AuthBoundary>,
) -> impl Filter<Extract = (AuthContext,), Error = Infallible> + Clone {
    warp::header::headers_cloned().and_then(move |headers: HeaderMap| {
        let boundary = boundary.clone();
        async move { Ok::<_, Infallible>(boundary.resolve(&headers).await) }
    })
}

/// Apply a session patch to a finished reply: bearer header plus
/// `Set-Cookie` for the refresh token.
pub fn merge_patch(
    reply: impl warp::Reply,
    patch: &SessionPatch,
    cookies: &CookieTransport,
) -> Response {
    let mut response = reply.into_response();
    let headers = response.headers_mut();

    if let Some(access_token) = &patch.access_token {
        match HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, access_token.0)) {
            Ok(value) => {
                headers.insert(header::AUTHORIZATION, value);
                headers.insert(
                    header::ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static("Authorization"),
                );
            }
            Err(e) => warn!(error = %e, "access token is not a valid header value"),
        }
    }

    if let Some(directive) = &patch.refresh_cookie {
        match HeaderValue::from_str(&cookies.render_directive(directive)) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "refresh cookie is not a valid header value"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::*;
    use crate::domain_model::SubjectId;
    use crate::domain_port::{ManualClock, RevocationStore};
    use crate::infra_memory::MemoryRevocationStore;
    use chrono::DateTime;
    use std::time::Duration;
    use warp::http::StatusCode;

    const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
    const REFRESH_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryRevocationStore>,
        sessions: Arc<RotatingSessionService>,
        boundary: AuthBoundary,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let codec = Arc::new(JwtHs512Codec::new(
            b"boundary-test-key-boundary-test-key-boundary-test-key",
            clock.clone(),
        ));
        let store = Arc::new(MemoryRevocationStore::new(clock.clone()));
        let sessions = Arc::new(RotatingSessionService::new(
            codec.clone(),
            store.clone(),
            SessionConfig {
                access_ttl: ACCESS_TTL,
                refresh_ttl: REFRESH_TTL,
            },
        ));
        let cookies = Arc::new(CookieTransport::new("refresh_token", REFRESH_TTL, None));
        let boundary = AuthBoundary::new(codec, sessions.clone(), cookies);
        Fixture {
            clock,
            store,
            sessions,
            boundary,
        }
    }

    fn request_headers(access: Option<&str>, refresh: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(a) = access {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", a)).unwrap(),
            );
        }
        if let Some(r) = refresh {
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("refresh_token={}", r)).unwrap(),
            );
        }
        headers
    }

    async fn login(f: &Fixture) -> (String, String) {
        let patch = f
            .sessions
            .issue(&Principal::new("u1", ["USER"]))
            .await
            .unwrap();
        let refresh = patch.refresh_token().cloned().unwrap();
        (patch.access_token.unwrap().0, refresh.0)
    }

    #[tokio::test]
    async fn valid_access_token_binds_principal_without_patch() {
        let f = fixture();
        let (a1, _) = login(&f).await;

        let ctx = f.boundary.resolve(&request_headers(Some(&a1), None)).await;
        assert_eq!(ctx.require().unwrap().subject_id, SubjectId::from("u1"));
        assert!(ctx.patch().is_empty());
    }

    #[tokio::test]
    async fn missing_or_foreign_header_is_anonymous() {
        let f = fixture();
        assert!(f.boundary.resolve(&HeaderMap::new()).await.principal().is_none());

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dTE6cHc="));
        assert!(f.boundary.resolve(&basic).await.principal().is_none());

        let garbage = request_headers(Some("garbage"), None);
        assert!(f.boundary.resolve(&garbage).await.principal().is_none());
    }

    #[tokio::test]
    async fn expired_access_token_rotates_in_flight() {
        let f = fixture();
        let (a1, r1) = login(&f).await;
        f.clock.advance(Duration::from_secs(16 * 60));

        let ctx = f
            .boundary
            .resolve(&request_headers(Some(&a1), Some(&r1)))
            .await;

        assert_eq!(ctx.require().unwrap().subject_id, SubjectId::from("u1"));
        let r2 = ctx.patch().refresh_token().cloned().unwrap();
        assert_ne!(r2.0, r1);
        assert!(ctx.patch().access_token.is_some());
        assert_eq!(
            f.store.get(&SubjectId::from("u1")).await.unwrap(),
            Some(r2)
        );
    }

    #[tokio::test]
    async fn expired_access_token_without_cookie_is_anonymous() {
        let f = fixture();
        let (a1, r1) = login(&f).await;
        f.clock.advance(Duration::from_secs(16 * 60));

        let ctx = f.boundary.resolve(&request_headers(Some(&a1), None)).await;
        assert!(ctx.principal().is_none());
        assert!(ctx.patch().is_empty());
        // nothing was revoked
        assert_eq!(
            f.store.get(&SubjectId::from("u1")).await.unwrap().map(|t| t.0),
            Some(r1)
        );
    }

    #[tokio::test]
    async fn replayed_refresh_cookie_revokes_and_stays_anonymous() {
        let f = fixture();
        let (a1, r1) = login(&f).await;
        f.clock.advance(Duration::from_secs(16 * 60));
        f.boundary
            .resolve(&request_headers(Some(&a1), Some(&r1)))
            .await;

        let replay = f
            .boundary
            .resolve(&request_headers(Some(&a1), Some(&r1)))
            .await;
        assert!(replay.principal().is_none());
        assert_eq!(f.store.get(&SubjectId::from("u1")).await.unwrap(), None);
    }

    #[test]
    fn merge_patch_sets_header_and_cookie() {
        let cookies = CookieTransport::new("refresh_token", REFRESH_TTL, None);
        let patch = SessionPatch::issued(
            AccessToken("a2".into()),
            RefreshToken("r2".into()),
        );

        let response = merge_patch(warp::reply(), &patch, &cookies);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::AUTHORIZATION], "Bearer a2");
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS],
            "Authorization"
        );
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "refresh_token=r2; Max-Age=1209600; Path=/; Secure; HttpOnly"
        );
    }

    #[test]
    fn merge_empty_patch_leaves_reply_untouched() {
        let cookies = CookieTransport::new("refresh_token", REFRESH_TTL, None);
        let response = merge_patch(warp::reply(), &SessionPatch::default(), &cookies);
        assert!(response.headers().get(header::AUTHORIZATION).is_none());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn with_auth_filter_extracts_context() {
        let f = fixture();
        let (a1, _) = login(&f).await;
        let filter = with_auth(Arc::new(f.boundary));

        let ctx = warp::test::request()
            .header("authorization", format!("Bearer {}", a1))
            .filter(&filter)
            .await
            .unwrap();
        assert!(ctx.principal().is_some());

        let anonymous = warp::test::request().filter(&filter).await.unwrap();
        assert!(anonymous.principal().is_none());
    }
}
