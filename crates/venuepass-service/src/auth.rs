//! Session extraction.
//!
//! Authentication and authorization live upstream; requests arrive with the
//! resolved session in trusted headers (`x-user-id`, `x-user-role`), which
//! this module extracts and exposes to handlers. A missing or malformed
//! header pair is rejected as unauthorized.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use venuepass_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Role carried by the resolved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A facility user (books passes).
    User,
    /// A facility owner (manages slots, marks attendance).
    Owner,
    /// A platform admin.
    Admin,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "OWNER" => Some(Self::Owner),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The resolved session of the calling user.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// The caller's user id.
    pub user_id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl Session {
    /// Require the user role.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for other roles.
    pub fn ensure_user(&self) -> Result<(), ApiError> {
        if self.role == Role::User {
            Ok(())
        } else {
            Err(ApiError::Forbidden("user role required".into()))
        }
    }

    /// Require the owner role.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for other roles.
    pub fn ensure_owner(&self) -> Result<(), ApiError> {
        if self.role == Role::Owner {
            Ok(())
        } else {
            Err(ApiError::Forbidden("owner role required".into()))
        }
    }

    /// Require the admin role.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for other roles.
    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".into()))
        }
    }

    /// Whether the caller is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("x-user-id")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<UserId>().ok())
                .ok_or(ApiError::Unauthorized)?;

            let role = parts
                .headers
                .get("x-user-role")
                .and_then(|v| v.to_str().ok())
                .and_then(Role::parse)
                .ok_or(ApiError::Unauthorized)?;

            Ok(Session { user_id, role })
        })
    }
}
