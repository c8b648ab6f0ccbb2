pub mod auth;
pub mod channel;
pub mod channels;
pub mod dm;
pub mod error;
pub mod message;
pub mod middleware;
pub mod standup;
pub mod state;
pub mod stats;
pub mod users;

use axum::Json;
use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use huddle_types::models::Workspace;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Reset the workspace to its seeded initial state and drop every
/// pending standup flush. Test/maintenance hook; unauthenticated like
/// the rest of the public routes.
async fn clear(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.standups.cancel_all();
    state.store.write(|data| {
        *data = Workspace::new();
        Ok::<_, ApiError>(())
    })?;
    Ok(Json(json!({})))
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/clear", delete(clear))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/passwordreset/request", post(auth::password_reset_request))
        .route("/auth/passwordreset/reset", post(auth::password_reset))
        .route("/channels/create", post(channels::create))
        .route("/channels/list", get(channels::list))
        .route("/channels/listall", get(channels::list_all))
        .route("/channel/details", get(channel::details))
        .route("/channel/join", post(channel::join))
        .route("/channel/leave", post(channel::leave))
        .route("/channel/invite", post(channel::invite))
        .route("/channel/addowner", post(channel::add_owner))
        .route("/channel/removeowner", post(channel::remove_owner))
        .route("/channel/messages", get(channel::messages))
        .route("/message/send", post(message::send))
        .route("/message/senddm", post(message::send_dm))
        .route("/message/edit", put(message::edit))
        .route("/message/remove", delete(message::remove))
        .route("/message/react", post(message::react))
        .route("/message/unreact", post(message::unreact))
        .route("/message/pin", post(message::pin))
        .route("/message/unpin", post(message::unpin))
        .route("/dm/create", post(dm::create))
        .route("/dm/list", get(dm::list))
        .route("/dm/details", get(dm::details))
        .route("/dm/messages", get(dm::messages))
        .route("/dm/leave", post(dm::leave))
        .route("/dm/remove", delete(dm::remove))
        .route("/user/profile", get(users::profile))
        .route("/user/profile/setname", put(users::set_name))
        .route("/user/profile/setemail", put(users::set_email))
        .route("/user/profile/sethandle", put(users::set_handle))
        .route("/user/profile/uploadphoto", post(users::upload_photo))
        .route("/users/all", get(users::all))
        .route("/user/stats", get(stats::user_stats))
        .route("/users/stats", get(stats::workspace_stats))
        .route("/standup/start", post(standup::start))
        .route("/standup/send", post(standup::send))
        .route("/standup/active", get(standup::active))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
