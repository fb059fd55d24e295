// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # SSO Actions
//!
//! The three actions consumed by the access gate: `login` (redirect to the
//! SSO login initiator, or fall through to authentication), `authenticate`
//! (extract and validate attributes, establish the session), and `logout`
//! (clear the session and optionally notify the SSO logout initiator).
//!
//! These routes carry no gate layer; they must stay reachable while
//! anonymous or every login would loop.

use axum::{
    extract::{Query, State},
    http::{header::HOST, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::gate::run_authentication;
use crate::headers::RawHeaderSet;
use crate::session::Session;
use crate::state::AppState;

/// Route performing attribute extraction; the login initiator's target.
pub const AUTHENTICATE_PATH: &str = "/sso/authenticate";

/// The router exposing the three SSO actions.
pub fn sso_router(state: AppState) -> Router {
    Router::new()
        .route("/sso/login", get(login))
        .route(AUTHENTICATE_PATH, get(authenticate))
        .route("/sso/logout", get(logout))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct ReturnQuery {
    /// Return URL carried across the SSO round trip as a query parameter.
    #[serde(rename = "return")]
    return_url: Option<String>,
}

/// Initiate an SSO login.
///
/// In mock mode the "initiator" is the local authenticate action, with the
/// flashed return URL carried as a query parameter since no server-side
/// flash can cross a round trip through a real initiator. Otherwise the
/// configured initiator receives the authenticate URL as its `target`,
/// with the return URL encoded into it.
async fn login(State(state): State<AppState>, session: Session, headers: HeaderMap) -> Response {
    if let Some(response) = state.hooks.before_login(&session) {
        return response;
    }

    if !state.config.login_enable {
        debug!("login redirect disabled, proceeding straight to authentication");
        return complete_authentication(&state, &session, &headers, None);
    }

    let authenticate_url = format!("{}{}", base_url(&state, &headers), AUTHENTICATE_PATH);
    let return_url = session.flash_take("url");

    let location = if state.config.mock_enabled() {
        match return_url {
            Some(ret) => format!("{authenticate_url}?return={}", url_encode(&ret)),
            None => authenticate_url,
        }
    } else {
        let target = match return_url {
            Some(ret) => format!("{authenticate_url}?return={ret}"),
            None => authenticate_url,
        };
        format!("{}?target={}", state.config.login_url, url_encode(&target))
    };

    debug!(%location, "redirecting to SSO login initiator");
    Redirect::temporary(&location).into_response()
}

/// Authenticate the session after returning from the SSO round trip.
async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ReturnQuery>,
    headers: HeaderMap,
) -> Response {
    complete_authentication(&state, &session, &headers, query.return_url)
}

/// Log out: clear the session and redirect, through the SSO logout
/// initiator when configured.
async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Some(response) = state.hooks.before_logout(&session) {
        return response;
    }

    session.clear();
    debug!("session cleared");

    if let Some(response) = state.hooks.after_logout(&session) {
        return response;
    }

    let return_url = state.config.logout_return.as_str();
    if state.config.logout_enable {
        let location = format!(
            "{}?return={}",
            state.config.logout_url,
            url_encode(return_url)
        );
        debug!(%location, "redirecting to SSO logout initiator");
        return Redirect::temporary(&location).into_response();
    }

    Redirect::temporary(return_url).into_response()
}

/// Run extraction/validation and finish with the post-authentication
/// redirect, honoring hook short-circuits.
fn complete_authentication(
    state: &AppState,
    session: &Session,
    transport: &HeaderMap,
    return_query: Option<String>,
) -> Response {
    let raw = if state.config.mock_enabled() {
        state.mock.snapshot()
    } else {
        RawHeaderSet::from_header_map(transport)
    };

    match run_authentication(state, session, &raw) {
        Err(response) => response,
        Ok(_) => {
            if let Some(response) = state.hooks.after_authentication(session) {
                return response;
            }

            // Precedence: flash > query parameter > configured default > root.
            let url = session
                .flash_take("url")
                .or(return_query)
                .or_else(|| state.config.login_return.clone())
                .unwrap_or_else(|| "/".to_string());

            debug!(%url, "redirecting back to destination");
            Redirect::temporary(&url).into_response()
        }
    }
}

/// Base for absolute URLs: configuration first, then the request's `Host`.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .filter(|proto| proto.eq_ignore_ascii_case("https"))
        .map_or("http", |_| "https");

    format!("{scheme}://{host}")
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ExtractedAttributes;
    use crate::config::GateConfig;
    use crate::error::GateError;
    use crate::gate::{self, AccessGate};
    use crate::hooks::GateHooks;
    use crate::session::{attach_session, SESSION_COOKIE, SESSION_MARKER};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        middleware, Json,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const MOCK_PROPERTIES: &[(&str, &str)] = &[
        ("mode", "mock"),
        ("attribute.email", "X-Email"),
        ("attribute.firstName", "X-Given"),
        ("attribute.lastName", "X-Sur"),
        ("require", "email"),
        ("mock.X-Email", "u@d.org"),
        ("mock.X-Given", "U"),
        ("mock.X-Sur", "D"),
    ];

    #[derive(Default)]
    struct CountingHooks {
        authentications: AtomicUsize,
        attribute_failures: AtomicUsize,
        check_failures: AtomicUsize,
        granted: Vec<String>,
    }

    impl GateHooks for CountingHooks {
        fn after_authentication(&self, _session: &Session) -> Option<Response> {
            self.authentications.fetch_add(1, Ordering::SeqCst);
            None
        }

        fn check(&self, profile: &str, _session: &Session) -> bool {
            self.granted.iter().any(|p| p == profile)
        }

        fn on_check_failed(&self, profile: &str) -> Response {
            self.check_failures.fetch_add(1, Ordering::SeqCst);
            GateError::forbidden(format!("denied: {profile}")).into_response()
        }

        fn on_attribute_failure(&self, _partial: &ExtractedAttributes) -> Response {
            self.attribute_failures.fetch_add(1, Ordering::SeqCst);
            GateError::authentication_failure("attributes missing").into_response()
        }
    }

    fn state_with(properties: &[(&str, &str)]) -> AppState {
        let config = GateConfig::from_properties(properties.iter().copied(), false).unwrap();
        AppState::new(config)
    }

    async fn profile_page(session: Session) -> Json<serde_json::Value> {
        Json(serde_json::json!(session.snapshot()))
    }

    /// Demo host wiring: a gated route, the SSO actions, and the session
    /// cookie layer around everything.
    fn app(state: AppState, profiles: &[&str]) -> Router {
        let mut access = AccessGate::new(state.clone());
        if !profiles.is_empty() {
            access = access.with_profiles(profiles.iter().copied());
        }

        let protected = Router::new()
            .route("/profile", get(profile_page))
            .layer(middleware::from_fn_with_state(access, gate::enforce))
            .with_state(state.clone());

        Router::new()
            .merge(protected)
            .merge(sso_router(state))
            .layer(middleware::from_fn(attach_session))
    }

    async fn send(app: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().uri(uri).header(HOST, "localhost");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post(app: &Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(axum::http::Method::POST)
                    .uri(uri)
                    .header(HOST, "localhost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("redirect location")
            .to_str()
            .unwrap()
            .to_string()
    }

    fn session_cookie(response: &axum::response::Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie assigned")
            .to_str()
            .unwrap();
        set_cookie
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    fn session_id(cookie: &str) -> &str {
        cookie
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .expect("session cookie format")
    }

    #[tokio::test]
    async fn full_round_trip_with_mock_headers() {
        let state = state_with(MOCK_PROPERTIES);
        let app = app(state.clone(), &[]);

        // 1. Anonymous request to a protected action redirects to login.
        let response = send(&app, "/profile", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/sso/login");
        let cookie = session_cookie(&response);

        // 2. Login in mock mode redirects to the local authenticate action
        //    with the flashed return URL as a query parameter.
        let response = send(&app, "/sso/login", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location(&response),
            "http://localhost/sso/authenticate?return=%2Fprofile"
        );

        // 3. Authenticate extracts the mock headers and redirects back.
        let response = send(&app, "/sso/authenticate?return=%2Fprofile", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/profile");

        let sid = session_id(&cookie).to_string();
        let session_values = state.sessions.snapshot(&sid);
        assert_eq!(session_values["email"], "u@d.org");
        assert_eq!(session_values["firstName"], "U");
        assert_eq!(session_values["lastName"], "D");
        assert!(session_values.contains_key(SESSION_MARKER));

        // 4. The protected action now serves the request.
        let response = send(&app, "/profile", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // 5. Logout clears the session and redirects to the root.
        let response = send(&app, "/sso/logout", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/");
        assert!(state.sessions.snapshot(&sid).is_empty());
    }

    #[tokio::test]
    async fn gated_requests_are_idempotent_once_authenticated() {
        let state = state_with(MOCK_PROPERTIES);
        let app = app(state.clone(), &[]);

        let response = send(&app, "/profile", None).await;
        let cookie = session_cookie(&response);
        send(&app, "/sso/authenticate", Some(&cookie)).await;

        let sid = session_id(&cookie).to_string();
        let marker_before = state.sessions.get(&sid, SESSION_MARKER).unwrap();

        // Two further gated requests: no redirects, no session rewrites.
        for _ in 0..2 {
            let response = send(&app, "/profile", Some(&cookie)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(
            state.sessions.get(&sid, SESSION_MARKER),
            Some(marker_before)
        );
    }

    #[tokio::test]
    async fn missing_required_attribute_blocks_authentication() {
        let mut properties: Vec<(&str, &str)> = MOCK_PROPERTIES.to_vec();
        properties.retain(|(key, _)| *key != "mock.X-Email");

        let hooks = Arc::new(CountingHooks::default());
        let mut state = state_with(&properties);
        state.hooks = hooks.clone();
        let app = app(state.clone(), &[]);

        let response = send(&app, "/sso/authenticate", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hooks.attribute_failures.load(Ordering::SeqCst), 1);

        let cookie = session_cookie(&response);
        let sid = session_id(&cookie).to_string();
        assert!(!state.sessions.contains(&sid, SESSION_MARKER));
    }

    #[tokio::test]
    async fn multi_valued_mock_header_uses_first_value() {
        let state = state_with(MOCK_PROPERTIES);
        state.mock.set_multi("X-Email", ["first@x", "second@x"]);
        let app = app(state.clone(), &[]);

        let response = send(&app, "/sso/authenticate", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

        let cookie = session_cookie(&response);
        let sid = session_id(&cookie).to_string();
        assert_eq!(
            state.sessions.get(&sid, "email"),
            Some("first@x".to_string())
        );
    }

    #[tokio::test]
    async fn failing_profile_check_is_forbidden_and_fires_hook_once() {
        let hooks = Arc::new(CountingHooks::default());
        let mut state = state_with(MOCK_PROPERTIES);
        state.hooks = hooks.clone();
        // Two declared profiles, both failing: the first short-circuits.
        let app = app(state.clone(), &["isAdmin", "isAuditor"]);

        let response = send(&app, "/sso/authenticate", None).await;
        let cookie = session_cookie(&response);

        let response = send(&app, "/profile", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(hooks.check_failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn passing_profile_check_reaches_the_action() {
        let hooks = Arc::new(CountingHooks {
            granted: vec!["isAdmin".to_string()],
            ..CountingHooks::default()
        });
        let mut state = state_with(MOCK_PROPERTIES);
        state.hooks = hooks.clone();
        let app = app(state.clone(), &["isAdmin"]);

        let response = send(&app, "/sso/authenticate", None).await;
        let cookie = session_cookie(&response);

        let response = send(&app, "/profile", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hooks.check_failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn real_mode_login_targets_the_configured_initiator() {
        let state = state_with(&[("attribute.email", "X-Email")]);
        let app = app(state, &[]);

        let response = send(&app, "/profile", None).await;
        let cookie = session_cookie(&response);

        let response = send(&app, "/sso/login", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = location(&response);
        assert!(
            location.starts_with("/Shibboleth.sso/Login?target=http%3A%2F%2Flocalhost%2Fsso%2Fauthenticate"),
            "unexpected initiator location: {location}"
        );
        // The flashed return URL rides inside the encoded target.
        assert!(location.contains("%3Freturn%3D%2Fprofile"));
    }

    #[tokio::test]
    async fn unauthenticated_post_redirects_to_login_as_see_other() {
        let state = state_with(MOCK_PROPERTIES);
        let app = app(state, &[]);

        // 303 so the browser follows with GET; a method-preserving redirect
        // would replay the POST against the GET-only login action.
        let response = post(&app, "/profile").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/sso/login");

        let cookie = session_cookie(&response);
        let response = send(&app, "/sso/login", Some(&cookie)).await;
        assert_ne!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn local_authentication_fires_the_post_authentication_hook() {
        let hooks = Arc::new(CountingHooks::default());
        let mut state = state_with(&[
            ("login.enable", "false"),
            ("mode", "mock"),
            ("attribute.email", "X-Email"),
            ("mock.X-Email", "u@d.org"),
        ]);
        state.hooks = hooks.clone();
        let app = app(state, &[]);

        let response = send(&app, "/profile", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hooks.authentications.load(Ordering::SeqCst), 1);

        // Already authenticated: no re-authentication, no second hook call.
        let cookie = session_cookie(&response);
        let response = send(&app, "/profile", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hooks.authentications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_authentication_honors_the_hook_short_circuit() {
        struct WelcomeHooks;
        impl GateHooks for WelcomeHooks {
            fn after_authentication(&self, _session: &Session) -> Option<Response> {
                Some(Redirect::temporary("/welcome").into_response())
            }
        }

        let mut state = state_with(&[
            ("login.enable", "false"),
            ("mode", "mock"),
            ("attribute.email", "X-Email"),
            ("mock.X-Email", "u@d.org"),
        ]);
        state.hooks = Arc::new(WelcomeHooks);
        let app = app(state, &[]);

        let response = send(&app, "/profile", None).await;
        assert_eq!(location(&response), "/welcome");
    }

    #[tokio::test]
    async fn local_authentication_mode_skips_the_login_redirect() {
        let state = state_with(&[
            ("login.enable", "false"),
            ("mode", "mock"),
            ("attribute.email", "X-Email"),
            ("mock.X-Email", "u@d.org"),
        ]);
        let app = app(state.clone(), &[]);

        // No round trip: the gate authenticates inline and serves the page.
        let response = send(&app, "/profile", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = session_cookie(&response);
        let sid = session_id(&cookie).to_string();
        assert_eq!(state.sessions.get(&sid, "email"), Some("u@d.org".to_string()));
    }

    #[tokio::test]
    async fn sso_logout_redirects_through_the_initiator() {
        let state = state_with(&[
            ("mode", "mock"),
            ("logout.enable", "true"),
            ("logout.return", "/goodbye"),
        ]);
        let app = app(state.clone(), &[]);

        let response = send(&app, "/sso/authenticate", None).await;
        let cookie = session_cookie(&response);

        let response = send(&app, "/sso/logout", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            location(&response),
            "/Shibboleth.sso/Logout?return=%2Fgoodbye"
        );

        let sid = session_id(&cookie).to_string();
        assert!(state.sessions.snapshot(&sid).is_empty());
    }

    #[tokio::test]
    async fn configured_login_return_is_the_fallback_destination() {
        let mut properties: Vec<(&str, &str)> = MOCK_PROPERTIES.to_vec();
        properties.push(("login.return", "/home"));
        let state = state_with(&properties);
        let app = app(state, &[]);

        // No flash, no query parameter: fall back to login.return.
        let response = send(&app, "/sso/authenticate", None).await;
        assert_eq!(location(&response), "/home");
    }

    #[tokio::test]
    async fn before_login_hook_short_circuits_the_redirect() {
        struct StubbornHooks;
        impl GateHooks for StubbornHooks {
            fn before_login(&self, _session: &Session) -> Option<Response> {
                Some((StatusCode::IM_A_TEAPOT, "nope").into_response())
            }
        }

        let mut state = state_with(MOCK_PROPERTIES);
        state.hooks = Arc::new(StubbornHooks);
        let app = app(state, &[]);

        let response = send(&app, "/sso/login", None).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn after_authentication_hook_response_is_honored() {
        struct WelcomeHooks;
        impl GateHooks for WelcomeHooks {
            fn after_authentication(&self, _session: &Session) -> Option<Response> {
                Some(Redirect::temporary("/welcome").into_response())
            }
        }

        let mut state = state_with(MOCK_PROPERTIES);
        state.hooks = Arc::new(WelcomeHooks);
        let app = app(state, &[]);

        let response = send(&app, "/sso/authenticate?return=%2Fprofile", None).await;
        assert_eq!(location(&response), "/welcome");
    }
}
