use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, MatchedPath, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod helpers;
pub mod models;
pub mod password;
pub mod repository;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{files, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState, UserRepository};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json` and browsable
/// through Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::register, handlers::login,
        handlers::upload_file, handlers::list_files
    ),
    components(
        schemas(
            models::PublicUser, models::RegisterRequest, models::LoginRequest,
            models::AuthResponse, models::UploadForm, models::UploadedFile, models::FileEntry,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "classroom-files", description = "Classroom file sharing API")
    )
)]
struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the file routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// The single, immutable container shared by every request: account persistence,
/// file storage and configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
}

// The auth extractor only needs the configuration (for the signing secret).
impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// The authentication gate in front of the file routes.
///
/// *Mechanism*: extracting `AuthUser` validates the bearer token. When that fails the
/// extractor's rejection (401 + JSON error) is returned as the response and `next`
/// is never called, so the handler does not run. On success the principal is stored
/// in the request extensions, where handlers read it with `Extension<AuthUser>`.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    Span::current().record("user_id", tracing::field::display(auth_user.id));
    tracing::debug!(role = %auth_user.role, "request authenticated");
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the whole routing tree, applies the gate and global layers, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: any origin, as the browser client is served from elsewhere.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let max_upload_bytes = state.config.max_upload_bytes;

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // File routes: gated. `route_layer` only runs the gate for matched routes.
        .nest(
            "/api/files",
            files::file_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. A UUID per incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 3b. One tracing span per request, tagged with the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// request_span
///
/// One span per request. `route` is the matched template (`/api/files/upload`), or the
/// raw path for requests that matched nothing. `user_id` stays empty until the gate
/// accepts the request.
fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| request.uri().path());

    tracing::info_span!(
        "request",
        method = %request.method(),
        route,
        request_id,
        user_id = tracing::field::Empty,
    )
}
