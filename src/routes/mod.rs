//! Routers split by access level. Authentication is applied per router in
//! `create_router`; role checks happen inside the admin handlers.

/// Browse, preview images, search logging, registration. Anonymous callers welcome.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Moderation and catalog management, nested under `/api/admin`.
pub mod admin;
