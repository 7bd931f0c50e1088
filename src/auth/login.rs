use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object,
    },
    error::{ALError, ClubError},
    liquid_utils::compile_with_newtitle,
    state::ClubState,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Form, Router,
};
use axum_login::login_required;
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[axum::debug_handler]
pub async fn get_sign_in(
    auth: Auth,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let aa = get_auth_object(auth).await?;
    compile_with_newtitle(
        "www/signin.liquid",
        liquid::object!({ "auth": aa, "demo_email": state.settings.seed.email.clone() }),
        &state.settings,
        &state.cache,
        Some("Sign In".into()),
    )
    .await
}

#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub enum FailureReason {
    #[serde(rename = "user_not_found")]
    UserNotFound,
    #[serde(rename = "missing_password")]
    MissingPassword,
}

impl FailureReason {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::MissingPassword => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::UNAUTHORIZED,
        }
    }
}

#[axum::debug_handler]
pub async fn get_sign_in_failure(
    auth: Auth,
    Path(reason): Path<FailureReason>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let aa = get_auth_object(auth).await?;
    let html = compile_with_newtitle(
        "www/failed_auth.liquid",
        liquid::object!({ "auth": aa, "reason": reason }),
        &state.settings,
        &state.cache,
        Some("Sign In Failed".into()),
    )
    .await?;

    Ok((reason.status_code(), html).into_response())
}

#[derive(Clone)]
pub struct SignInCreds {
    pub email: String,
    pub password: String,
}

#[axum::debug_handler]
pub async fn post_sign_in(
    mut auth: Auth,
    Form(SignInForm { email, password }): Form<SignInForm>,
) -> Result<impl IntoResponse, ClubError> {
    Ok(Redirect::to(
        match auth
            .authenticate(SignInCreds {
                email: email.clone(),
                password,
            })
            .await
        {
            Ok(Some(member)) => {
                let landing = member.role.landing_page();
                auth.login(&member).await?;
                info!(?email, "Signed in");
                landing
            }
            Ok(None) => {
                warn!(?email, "Sign in for unknown email");
                "/signin_failure/user_not_found"
            }
            Err(ALError::Backend(ClubError::LoginFailure { .. })) => {
                "/signin_failure/missing_password"
            }
            Err(error) => return Err(error.into()),
        },
    ))
}

#[axum::debug_handler]
pub async fn get_sign_out(mut auth: Auth) -> Result<impl IntoResponse, ClubError> {
    auth.logout().await?;
    Ok(Redirect::to("/"))
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route("/signout", get(get_sign_out))
        .route_layer(login_required!(ClubAuthBackend, login_url = "/signin"))
        .route("/signin", get(get_sign_in).post(post_sign_in))
        .route("/signin_failure/:reason", get(get_sign_in_failure))
}
