/// Router Module Index
///
/// Routes are split by access level so the authentication gate is attached to a
/// whole module at once rather than handler by handler.

/// Routes open to anonymous clients: health check and account endpoints.
pub mod public;

/// File routes. Every route here sits behind the authentication gate.
pub mod files;
