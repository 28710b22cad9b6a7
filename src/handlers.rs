use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    errors::ApiError,
    extract::ApiJson,
    helpers,
    models::{
        AuthResponse, FileEntry, LoginRequest, NewUser, PublicUser, RegisterRequest, UploadForm,
        UploadedFile,
    },
    password::{self, PasswordError},
    repository::RepositoryError,
};
use axum::{
    Json,
    Extension,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use chrono::Utc;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns the trimmed value of a form field, or `None` when it is absent or blank.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// --- Handlers ---

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "Classroom Backend Running"
}

/// register
///
/// [Public Route] Creates an account and returns it together with a fresh token.
///
/// *Flow*: validate input → hash the password off the async runtime → insert the
/// user (a duplicate email is a 409) → sign a token.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing or invalid field"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (Some(email), Some(password), Some(role)) = (
        non_empty(payload.email),
        payload.password.filter(|p| !p.is_empty()),
        non_empty(payload.role),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if !helpers::is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Registration error: hashing task failed: {:?}", e);
            ApiError::internal("Registration failed")
        })?
        .map_err(|e| {
            tracing::error!("Registration error: {}", e);
            ApiError::internal("Registration failed")
        })?;

    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict => ApiError::Conflict("Email already exists".to_string()),
            other => {
                tracing::error!("Registration error: {}", other);
                ApiError::internal("Registration failed")
            }
        })?;

    let token = issue_token(user.id, &user.role, &state.config)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser::from(&user),
            token,
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a token. Unknown emails and wrong
/// passwords produce the same 401 so the endpoint does not reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing field"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        non_empty(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Email and password required"));
    };

    let user = state
        .repo
        .find_by_email(&email)
        .await
        .map_err(|e| {
            tracing::error!("Login error: {}", e);
            ApiError::internal("Login failed")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || {
        password::verify_password(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("Login error: verification task failed: {:?}", e);
        ApiError::internal("Login failed")
    })?;

    match verified {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => return Err(ApiError::unauthorized("Invalid credentials")),
        Err(e) => {
            tracing::warn!(user_id = %user.id, "stored password hash unusable: {}", e);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    }

    let token = issue_token(user.id, &user.role, &state.config)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        user: PublicUser::from(&user),
        token,
    }))
}

/// upload_file
///
/// [Authenticated Route] Stores the multipart field named `file` in the classroom
/// bucket under `{unix_millis}_{name}` and returns its public URL.
///
/// Other form fields are skipped. The file extension must be on the configured
/// allow-list (an empty list accepts everything).
#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = UploadedFile),
        (status = 400, description = "Not a multipart body, no file, or file type not allowed"),
        (status = 401, description = "Missing or invalid token"),
        (status = 413, description = "File too large")
    ),
    security(("bearer" = []))
)]
pub async fn upload_file(
    Extension(AuthUser { id: user_id, .. }): Extension<AuthUser>,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedFile>, ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "file".to_string());
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let extension = helpers::file_extension(&original_name);
        if !helpers::is_allowed_extension(&extension, &state.config.allowed_extensions) {
            return Err(ApiError::bad_request(format!(
                "File type not allowed: {}",
                if extension.is_empty() { "(none)" } else { extension.as_str() }
            )));
        }

        let body = field.bytes().await?;
        let size = body.len() as u64;
        let key = helpers::object_key_for(&original_name, Utc::now().timestamp_millis());

        state
            .storage
            .put_object(&key, body, &content_type)
            .await
            .inspect_err(|e| tracing::error!(%user_id, key = %key, "upload failed: {}", e))?;

        tracing::info!(%user_id, key = %key, size, "file uploaded");

        return Ok(Json(UploadedFile {
            url: state.storage.public_url(&key),
            name: original_name,
            size,
            size_label: helpers::format_file_size(size),
        }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// list_files
///
/// [Authenticated Route] Lists every file in the classroom bucket with its public URL.
#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "All files", body = [FileEntry]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_files(
    Extension(AuthUser { id: user_id, .. }): Extension<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let objects = state
        .storage
        .list_objects()
        .await
        .inspect_err(|e| tracing::error!(%user_id, "listing failed: {}", e))?;

    let files = objects
        .into_iter()
        .map(|object| FileEntry {
            url: state.storage.public_url(&object.key),
            name: object.key,
            size: object.size,
            size_label: helpers::format_file_size(object.size),
            created_at: object.created_at,
        })
        .collect::<Vec<_>>();

    tracing::debug!(%user_id, count = files.len(), "files listed");
    Ok(Json(files))
}
