//! Enforcement guards.
//!
//! A guard pairs a [`Requirement`] with a protected operation. The decision is
//! made entirely before the operation runs, so a denial has no side effects.
//! The caller's identity comes from an explicit [`CallContext`].

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::service::AuthorizationService;
use crate::store::StoreError;
use crate::{PermissionKey, Principal};

/// What a guard demands of the calling principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "required", rename_all = "snake_case")]
pub enum Requirement {
    /// A single `(resource, action)` pair.
    Permission(PermissionKey),
    /// Only superusers pass; the graph is never consulted.
    Superuser,
    /// At least one pair; evaluation stops at the first satisfied pair.
    AnyOf(Vec<PermissionKey>),
    /// Every pair; evaluation stops at the first unsatisfied pair.
    AllOf(Vec<PermissionKey>),
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fn join(f: &mut core::fmt::Formatter<'_>, keys: &[PermissionKey], sep: &str) -> core::fmt::Result {
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{key}")?;
            }
            Ok(())
        }

        match self {
            Requirement::Permission(key) => write!(f, "{key}"),
            Requirement::Superuser => f.write_str("superuser privileges"),
            Requirement::AnyOf(keys) => join(f, keys, " or "),
            Requirement::AllOf(keys) => join(f, keys, " and "),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {}", denial(.0))]
    Forbidden(Requirement),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn denial(requirement: &Requirement) -> String {
    match requirement {
        Requirement::Superuser => "superuser privileges required".to_string(),
        other => format!("requires {other}"),
    }
}

/// Invocation context carrying the caller's identity.
///
/// Guards read the principal from here and nowhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    principal: Option<Principal>,
}

impl CallContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

/// Builds guards and evaluates requirements against the authorization service.
#[derive(Debug, Clone)]
pub struct Enforcer {
    service: Arc<AuthorizationService>,
}

impl Enforcer {
    pub fn new(service: Arc<AuthorizationService>) -> Self {
        Self { service }
    }

    /// Decide whether the context's principal satisfies `requirement`.
    ///
    /// - `Unauthenticated` before any permission query when no principal is present
    /// - `Forbidden` carrying the requirement when the principal falls short
    pub async fn authorize(
        &self,
        ctx: &CallContext,
        requirement: &Requirement,
    ) -> Result<Principal, AuthzError> {
        let Some(principal) = ctx.principal().copied() else {
            warn!(requirement = %requirement, "denied: no principal in call context");
            return Err(AuthzError::Unauthenticated);
        };

        if self.evaluate(&principal, requirement).await? {
            debug!(user_id = %principal.id, requirement = %requirement, "allowed");
            Ok(principal)
        } else {
            warn!(user_id = %principal.id, requirement = %requirement, "denied: insufficient permissions");
            Err(AuthzError::Forbidden(requirement.clone()))
        }
    }

    async fn evaluate(&self, principal: &Principal, requirement: &Requirement) -> Result<bool, StoreError> {
        match requirement {
            Requirement::Superuser => Ok(principal.is_superuser),
            _ if self.service.bypasses(principal) => Ok(true),
            Requirement::Permission(key) => self.service.permits(principal, key).await,
            Requirement::AnyOf(keys) => {
                for key in keys {
                    if self.service.permits(principal, key).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Requirement::AllOf(keys) => {
                for key in keys {
                    if !self.service.permits(principal, key).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    pub fn guard<F>(&self, requirement: Requirement, op: F) -> Guarded<F> {
        Guarded {
            enforcer: self.clone(),
            requirement,
            op,
        }
    }

    pub fn require_permission<F>(
        &self,
        resource: impl Into<String>,
        action: impl Into<String>,
        op: F,
    ) -> Guarded<F> {
        self.guard(Requirement::Permission(PermissionKey::new(resource, action)), op)
    }

    pub fn require_superuser<F>(&self, op: F) -> Guarded<F> {
        self.guard(Requirement::Superuser, op)
    }

    pub fn require_any<F, K>(&self, keys: impl IntoIterator<Item = K>, op: F) -> Guarded<F>
    where
        K: Into<PermissionKey>,
    {
        self.guard(Requirement::AnyOf(keys.into_iter().map(Into::into).collect()), op)
    }

    pub fn require_all<F, K>(&self, keys: impl IntoIterator<Item = K>, op: F) -> Guarded<F>
    where
        K: Into<PermissionKey>,
    {
        self.guard(Requirement::AllOf(keys.into_iter().map(Into::into).collect()), op)
    }
}

/// A protected operation.
///
/// Calling it takes the operation's own argument plus the call context; the
/// operation's error type must be able to absorb [`AuthzError`].
#[derive(Debug, Clone)]
pub struct Guarded<F> {
    enforcer: Enforcer,
    requirement: Requirement,
    op: F,
}

impl<F> Guarded<F> {
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub async fn call<A, Fut, T, E>(&self, ctx: &CallContext, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthzError>,
    {
        self.enforcer.authorize(ctx, &self.requirement).await?;
        (self.op)(args).await
    }
}
