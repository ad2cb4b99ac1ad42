//! Cookie sessions, the user extractors, and the login/logout/signup pages.

use axum::extract::{FromRequestParts, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{Session, User};
use crate::error::NotekeeperError;

use super::error::AppError;
use super::forms::{FormErrors, LoginForm, SignupForm, BAD_CREDENTIALS, USERNAME_TAKEN};
use super::{redirect_found, routes, templates, AppState};

pub const SESSION_COOKIE: &str = "sessionid";

/// The logged-in user, if any.
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };
        let store = state.store.lock().await;
        Ok(CurrentUser(store.session_user(&token)?))
    }
}

/// The logged-in user. Anonymous requests are redirected to the login page
/// with `next` set to the requested path.
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match user {
            Some(user) => {
                // later extractors (the slug path) need it for their 404 page
                parts.extensions.insert(user.clone());
                Ok(RequireUser(user))
            }
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                debug!(path = %next, "anonymous request redirected to login");
                Err(redirect_found(&routes::login_redirect_url(next)))
            }
        }
    }
}

/// Read the session token from the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(session: &Session) -> String {
    let max_age = (session.expires_at - chrono::Utc::now()).num_seconds().max(0);
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    )
}

fn expired_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

fn with_cookie(cookie: String, response: Response) -> Response {
    ([(SET_COOKIE, cookie)], response).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn login_form(Query(query): Query<NextQuery>) -> Html<String> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    Html(templates::login(&form, &FormErrors::default()))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, AppError> {
    let store = state.store.lock().await;

    let Some(user) = store.authenticate(form.username.trim(), &form.password)? else {
        debug!(username = %form.username, "login rejected");
        let mut errors = FormErrors::default();
        errors.add_non_field(BAD_CREDENTIALS);
        return Ok(Html(templates::login(&form, &errors)).into_response());
    };

    let session = store.create_session(user.id, state.session_ttl)?;
    info!(user_id = user.id, "user logged in");

    let target = form
        .next
        .as_deref()
        .filter(|next| routes::is_safe_next(next))
        .unwrap_or(routes::NOTES_LIST);
    Ok(with_cookie(session_cookie(&session), redirect_found(target)))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.store.lock().await.delete_session(&token)?;
        info!("user logged out");
    }
    Ok(with_cookie(
        expired_cookie(),
        Html(templates::logged_out()).into_response(),
    ))
}

pub async fn signup_form() -> Html<String> {
    Html(templates::signup(&SignupForm::default(), &FormErrors::default()))
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Result<Response, AppError> {
    if let Err(errors) = form.clean() {
        return Ok(Html(templates::signup(&form, &errors)).into_response());
    }

    let store = state.store.lock().await;
    let user = match store.create_user(form.username.trim(), &form.password1) {
        Ok(user) => user,
        Err(NotekeeperError::UsernameTaken(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            return Ok(Html(templates::signup(&form, &errors)).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let session = store.create_session(user.id, state.session_ttl)?;
    info!(user_id = user.id, username = %user.username, "user signed up");
    Ok(with_cookie(session_cookie(&session), redirect_found(routes::HOME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_parsing() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("csrftoken=abc; sessionid={}; theme=dark", token)).unwrap(),
        );
        assert_eq!(session_token(&headers), Some(token));
    }

    #[test]
    fn test_session_token_missing_or_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("sessionid=not-a-uuid"));
        assert_eq!(session_token(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("othersessionid=x"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_session_cookie_format() {
        let session = Session::new(7, chrono::Duration::hours(1));
        let cookie = session_cookie(&session);
        assert!(cookie.starts_with(&format!("sessionid={};", session.token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age="));
    }
}
