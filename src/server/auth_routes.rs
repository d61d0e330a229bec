use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use super::api_error::ApiError;
use super::metrics;
use super::session::{BearerToken, Session};
use super::state::{GuardedUserManager, GuardedVerificationManager, ServerState};
use crate::user::{Registration, UserDetailsUpdate, UserError};
use crate::verification::{RedeemOutcome, VerificationError};

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct ResetPasswordBody {
    old_password: String,
    new_password: String,
}

#[derive(Deserialize)]
struct ActivationQuery {
    code: Option<String>,
}

#[derive(Deserialize)]
struct ActivationRequestBody {
    email: String,
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    State(verification): State<GuardedVerificationManager>,
    Json(body): Json<Registration>,
) -> Result<Response, ApiError> {
    let registered = user_manager.register(body)?;
    verification.send_link(&registered.email, &registered.username, &registered.code);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created. Check your email to verify your account.",
            "user_id": registered.user_id,
        })),
    )
        .into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let result = user_manager.login(&body.email, &body.password);
    let status = match &result {
        Ok(_) => "success",
        Err(UserError::InvalidCredentials) => "failure",
        Err(_) => "error",
    };
    metrics::record_login_attempt(status, start.elapsed());

    Ok(Json(result?).into_response())
}

async fn refresh(
    State(user_manager): State<GuardedUserManager>,
    BearerToken(token): BearerToken,
) -> Result<Response, ApiError> {
    Ok(Json(user_manager.refresh(&token)?).into_response())
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    BearerToken(token): BearerToken,
) -> Result<Response, ApiError> {
    user_manager.logout(&token)?;
    Ok(Json(json!({ "message": "Logged out" })).into_response())
}

async fn reset_password(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Response, ApiError> {
    user_manager.reset_password(session.user_id, &body.old_password, &body.new_password)?;
    Ok(Json(json!({ "message": "Password updated" })).into_response())
}

async fn update_details(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<UserDetailsUpdate>,
) -> Result<Response, ApiError> {
    let user = user_manager.update_details(session.user_id, body)?;
    Ok(Json(json!({ "message": "Details updated", "user": user })).into_response())
}

async fn get_details(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<usize>,
) -> Result<Response, ApiError> {
    if user_id != session.user_id {
        debug!(
            "User {} asked for the details of user {}",
            session.user_id, user_id
        );
        return Err(ApiError::forbidden("You can only read your own details"));
    }
    Ok(Json(user_manager.get_details(user_id)?).into_response())
}

async fn activate_account(
    State(verification): State<GuardedVerificationManager>,
    Query(query): Query<ActivationQuery>,
) -> Result<Response, ApiError> {
    let code = query.code.ok_or(VerificationError::Malformed)?;
    let links = verification.links();
    let redirect = match verification.redeem_code(&code)? {
        RedeemOutcome::Verified => Redirect::to(&links.verified_redirect_url),
        RedeemOutcome::Expired => Redirect::to(&links.request_activation_redirect_url),
    };
    Ok(redirect.into_response())
}

async fn request_activation(
    State(verification): State<GuardedVerificationManager>,
    Json(body): Json<ActivationRequestBody>,
) -> Result<Response, ApiError> {
    verification.issue_code(&body.email)?;
    Ok(Json(json!({
        "message": format!("A new verification link was sent to {}", body.email.trim())
    }))
    .into_response())
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
        .route("/reset_password", post(reset_password))
        .route("/update_details", put(update_details))
        .route("/get_details/{user_id}", get(get_details))
        .route(
            "/account/activation",
            get(activate_account).post(request_activation),
        )
        .with_state(state)
}
