use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware;

/// The full router: public routes, the bearer-protected `/api` surface and
/// the admin subset on top of it, with CORS and request tracing around
/// everything.
pub fn app() -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(follow_routes())
        .merge(post_routes())
        .merge(message_routes())
        .merge(mention_routes())
        .merge(tag_routes())
        .merge(media_routes())
        .merge(notification_routes())
        .merge(admin_routes())
        .route_layer(axum::middleware::from_fn(middleware::auth::require_auth));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Everything under /api requires a bearer token
        .merge(protected)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn auth_routes() -> Router {
    use handlers::protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn user_routes() -> Router {
    use axum::routing::{post, put};
    use handlers::protected::users;

    Router::new()
        .route("/api/users", get(users::search))
        // Static /me wins over the :username capture
        .route("/api/users/me", put(users::update_me).delete(users::delete_me))
        .route("/api/users/:username", get(users::profile))
        .route("/api/users/:username/posts", get(users::user_posts))
        .route(
            "/api/users/:username/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/api/users/:username/followers", get(users::followers))
        .route("/api/users/:username/following", get(users::following))
}

fn follow_routes() -> Router {
    use axum::routing::{delete, post};
    use handlers::protected::follows;

    Router::new()
        .route("/api/follows/requests", get(follows::requests))
        .route("/api/follows/requests/:id/accept", post(follows::accept))
        .route("/api/follows/requests/:id", delete(follows::reject))
}

fn post_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::posts;

    Router::new()
        .route("/api/posts", get(posts::timeline).post(posts::create))
        .route("/api/posts/:id", get(posts::show).delete(posts::delete))
        .route(
            "/api/posts/:id/like",
            post(posts::like).delete(posts::unlike),
        )
        .route("/api/posts/:id/likes", get(posts::likers))
        .route("/api/posts/:id/report", post(posts::report))
}

fn message_routes() -> Router {
    use axum::routing::put;
    use handlers::protected::messages;

    Router::new()
        .route("/api/messages", get(messages::conversations))
        .route(
            "/api/messages/:username",
            get(messages::thread).post(messages::send),
        )
        .route("/api/messages/:username/read", put(messages::read_thread))
}

fn mention_routes() -> Router {
    use handlers::protected::mentions;

    Router::new().route("/api/mentions", get(mentions::list))
}

fn tag_routes() -> Router {
    use handlers::protected::tags;

    Router::new()
        .route("/api/tags/trending", get(tags::trending))
        .route("/api/tags/:name/posts", get(tags::posts_for_tag))
}

fn media_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::media;

    Router::new()
        .route("/api/media", post(media::create))
        .route("/api/media/:id", get(media::show))
}

fn notification_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/api/notifications/read-all", post(notifications::read_all))
}

fn admin_routes() -> Router {
    use axum::routing::post;
    use handlers::admin::{bans, reports, stats};

    Router::new()
        .route("/api/admin/reports", get(reports::list))
        .route("/api/admin/reports/:id/resolve", post(reports::resolve))
        .route(
            "/api/admin/users/:id/ban",
            post(bans::ban).delete(bans::lift),
        )
        .route("/api/admin/stats", get(stats::stats))
        // Runs after require_auth, which is layered on the merged router
        .route_layer(axum::middleware::from_fn(middleware::admin::require_admin))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Roost API",
            "version": version,
            "description": "Small-flock social network backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "register": "/auth/register (public)",
                "login": "/auth/login (public)",
                "users": "/api/users[/:username] (protected)",
                "follows": "/api/follows/requests (protected)",
                "posts": "/api/posts[/:id] (protected)",
                "messages": "/api/messages[/:username] (protected)",
                "mentions": "/api/mentions (protected)",
                "tags": "/api/tags/trending, /api/tags/:name/posts (protected)",
                "media": "/api/media[/:id] (protected)",
                "notifications": "/api/notifications (protected)",
                "admin": "/api/admin/* (admin role)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::Database::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
