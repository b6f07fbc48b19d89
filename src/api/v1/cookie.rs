//! Refresh-token cookie: rendering `Set-Cookie` values and reading `Cookie`.

use crate::application_port::{CookieDirective, RefreshToken};
use std::time::Duration;
use warp::http::{HeaderMap, header};

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Set and clear must carry identical Path/Domain/Secure/HttpOnly
/// attributes, otherwise browsers keep the old cookie.
#[derive(Debug, Clone)]
pub struct CookieTransport {
    name: String,
    max_age_secs: u64,
    domain: Option<String>,
}

impl CookieTransport {
    pub fn new(name: impl Into<String>, max_age: Duration, domain: Option<String>) -> Self {
        Self {
            name: name.into(),
            max_age_secs: max_age.as_secs(),
            domain: domain.filter(|d| !d.trim().is_empty()),
        }
    }

    pub fn write(&self, token: &RefreshToken) -> String {
        self.render(&token.0, self.max_age_secs)
    }

    pub fn clear(&self) -> String {
        self.render("", 0)
    }

    pub fn render_directive(&self, directive: &CookieDirective) -> String {
        match directive {
            CookieDirective::Set(token) => self.write(token),
            CookieDirective::Clear => self.clear(),
        }
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let domain = match &self.domain {
            Some(d) => format!("; Domain={}", d),
            None => String::new(),
        };
        format!(
            "{}={}; Max-Age={}; Path=/{}; Secure; HttpOnly",
            self.name, value, max_age, domain
        )
    }

    /// The refresh token from the request's `Cookie` headers, if any.
    /// An empty value counts as absent.
    pub fn read(&self, headers: &HeaderMap) -> Option<RefreshToken> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|part| part.trim().split_once('='))
            .find(|(key, _)| key.trim() == self.name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| RefreshToken(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::HeaderValue;

    const FOURTEEN_DAYS: Duration = Duration::from_secs(14 * 24 * 60 * 60);

    fn headers(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    #[test]
    fn write_sets_all_attributes() {
        let cookies = CookieTransport::new(REFRESH_COOKIE_NAME, FOURTEEN_DAYS, None);
        let value = cookies.write(&RefreshToken("r1".into()));
        assert_eq!(
            value,
            "refresh_token=r1; Max-Age=1209600; Path=/; Secure; HttpOnly"
        );
    }

    #[test]
    fn clear_mirrors_write_attributes() {
        let cookies = CookieTransport::new(
            REFRESH_COOKIE_NAME,
            FOURTEEN_DAYS,
            Some("trips.example.com".into()),
        );
        let set = cookies.write(&RefreshToken("r1".into()));
        let cleared = cookies.clear();

        assert_eq!(
            set,
            "refresh_token=r1; Max-Age=1209600; Path=/; Domain=trips.example.com; Secure; HttpOnly"
        );
        assert_eq!(
            cleared,
            "refresh_token=; Max-Age=0; Path=/; Domain=trips.example.com; Secure; HttpOnly"
        );
        assert_eq!(
            cookies.render_directive(&CookieDirective::Clear),
            cleared
        );
    }

    #[test]
    fn blank_domain_is_omitted() {
        let cookies = CookieTransport::new(REFRESH_COOKIE_NAME, FOURTEEN_DAYS, Some(" ".into()));
        assert!(!cookies.clear().contains("Domain"));
    }

    #[test]
    fn read_finds_named_cookie_among_others() {
        let cookies = CookieTransport::new(REFRESH_COOKIE_NAME, FOURTEEN_DAYS, None);
        let h = headers("theme=dark; refresh_token=xyz789 ; lang=ko");
        assert_eq!(cookies.read(&h), Some(RefreshToken("xyz789".into())));
    }

    #[test]
    fn read_ignores_similar_names_and_empty_values() {
        let cookies = CookieTransport::new(REFRESH_COOKIE_NAME, FOURTEEN_DAYS, None);
        assert_eq!(cookies.read(&headers("old_refresh_token=abc")), None);
        assert_eq!(cookies.read(&headers("refresh_token=")), None);
        assert_eq!(cookies.read(&HeaderMap::new()), None);
    }

    #[test]
    fn read_scans_every_cookie_header() {
        let cookies = CookieTransport::new(REFRESH_COOKIE_NAME, FOURTEEN_DAYS, None);
        let mut h = headers("theme=dark");
        h.append(header::COOKIE, HeaderValue::from_static("refresh_token=r9"));
        assert_eq!(cookies.read(&h), Some(RefreshToken("r9".into())));
    }
}
