use askama::Template;
use axum::{
    extract::FromRequestParts,
    response::{Html, IntoResponse, Redirect, Response},
    Form, RequestPartsExt as _,
};
use booknest_dal::user::UserRepository;
use booknest_types::claim::{Role, SessionUser};
use http::request::Parts;
use tower_sessions::Session;
use tracing::{debug, error, warn};

use crate::{error::PageResult, state::AppState};

pub const SESSION_USER_KEY: &str = "user";

crate::repository_from_request!(UserRepository);

/// Extractor guarding admin pages. Anything short of an authenticated
/// session with the admin role is sent to the login page.
pub struct AdminUser(pub SessionUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts.extract::<Session>().await.map_err(|e| {
            error!("Cannot get session: {}", e.1);
            Redirect::to("/login")
        })?;
        let user = session
            .get::<SessionUser>(SESSION_USER_KEY)
            .await
            .map_err(|e| {
                error!("Failed to read user from session: {e}");
                Redirect::to("/login")
            })?;
        match user {
            Some(user) if user.is_admin() => Ok(AdminUser(user)),
            Some(user) => {
                warn!("User {} lacks the admin role", user.email);
                Err(Redirect::to("/login"))
            }
            None => {
                debug!("No user in session");
                Err(Redirect::to("/login"))
            }
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    message: Option<String>,
}

pub async fn login_page() -> PageResult<impl IntoResponse> {
    Ok(Html(LoginTemplate { message: None }.render()?))
}

#[derive(serde::Deserialize)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

pub async fn login(
    session: Session,
    user_registry: UserRepository,
    Form(credentials): Form<LoginCredentials>,
) -> PageResult<Response> {
    match user_registry
        .check_password(&credentials.email, &credentials.password)
        .await
    {
        Ok(user) => {
            let session_user = session_user_from(user);
            if !session_user.is_admin() {
                warn!("Rejected login of non-admin {}", session_user.email);
                return login_failed();
            }
            session.insert(SESSION_USER_KEY, session_user).await?;
            Ok(Redirect::to("/manage_books").into_response())
        }
        Err(booknest_dal::Error::InvalidCredentials) => login_failed(),
        Err(e) => Err(e.into()),
    }
}

fn login_failed() -> PageResult<Response> {
    let page = LoginTemplate {
        message: Some("Invalid email or password".to_string()),
    };
    Ok(Html(page.render()?).into_response())
}

fn session_user_from(user: booknest_dal::user::User) -> SessionUser {
    SessionUser {
        id: user.id,
        name: user.name,
        email: user.email,
        roles: user
            .roles
            .unwrap_or_default()
            .into_iter()
            .map(Role::from)
            .collect(),
    }
}

pub async fn logout(session: Session) -> PageResult<impl IntoResponse> {
    session
        .delete()
        .await
        .unwrap_or_else(|e| warn!("Failed to delete session: {e}"));
    Ok(Redirect::to("/login"))
}
