use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account as stored in the `users` table.
/// The password hash never leaves the server: it is skipped during serialization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // Argon2id PHC string.
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    // Free-form role label, e.g. 'student' or 'teacher'.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload handed to the repository once the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// PublicUser
///
/// The sanitised account view returned by register and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Fields are optional at the wire level so the handler can answer a missing field
/// with a 400 of its own instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "ada@school.edu")]
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(example = "student")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// UploadForm
///
/// OpenAPI description of the multipart body accepted by the upload route.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

// --- Response Payloads (Output Schemas) ---

/// AuthResponse
///
/// Returned by both register (201) and login (200).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub user: PublicUser,
    /// Bearer token accepted by the file routes.
    pub token: String,
}

/// UploadedFile
///
/// Result of `POST /api/files/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadedFile {
    /// The file name as sent by the client.
    #[schema(example = "week1_slides.pdf")]
    pub name: String,
    /// Public download URL of the stored object.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    #[schema(example = "1.5 MB")]
    pub size_label: String,
}

/// FileEntry
///
/// One row of `GET /api/files`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FileEntry {
    /// Stored object key, e.g. `1718000000000_week1_slides.pdf`.
    pub name: String,
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    #[schema(example = "1.5 MB")]
    pub size_label: String,
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
}
