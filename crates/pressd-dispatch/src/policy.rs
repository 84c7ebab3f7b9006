// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Policy & auth adapter: a `(path-prefix, operation, limit)` policy
// table plus the admin/owner gates the full operation set needs.

use std::net::IpAddr;

use pressd_core::config::setting_keys;
use pressd_core::error::{IppError, Result};
use pressd_core::model::{Job, Subscription};
use tracing::instrument;

/// Authorization requirement attached to an operation: the
/// `{denyAll|requireUser|requireAdmin}` limit vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLimit {
    DenyAll,
    RequireUser,
    RequireAdmin,
    /// No restriction beyond the request being well-formed.
    Anonymous,
}

/// Identity established for one request, after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_name: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Identity {
            user_name: "anonymous".to_string(),
            is_admin: false,
        }
    }
}

/// What a request needs evaluated against policy: its path, the operation
/// it names, and the peer address (for the loopback-only `X-Remote-User`
/// trust rule).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub operation: String,
    pub peer: Option<IpAddr>,
    /// `X-Remote-User`, only honored when `peer` is loopback.
    pub remote_user_header: Option<String>,
    /// Basic/Digest-authenticated user name, if any.
    pub authenticated_user: Option<String>,
}

/// Authenticates a request's claimed identity against a credential scheme.
/// A thin seam so tests can supply a fake without a real credential store;
/// the HTTP listener (`pressd-server`) supplies the production
/// implementation.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, ctx: &RequestContext) -> Option<Identity>;
}

/// Admin-only operations — anything that changes a
/// destination's configuration or another user's jobs server-wide.
const ADMIN_ONLY_OPERATIONS: &[&str] = &[
    "CUPS-Add-Modify-Printer",
    "CUPS-Add-Modify-Class",
    "CUPS-Delete-Printer",
    "CUPS-Delete-Class",
    "CUPS-Set-Default",
    "Pause-Printer",
    "Resume-Printer",
    "Disable-Printer",
    "Enable-Printer",
    "Hold-New-Jobs",
    "Release-Held-New-Jobs",
    "Purge-Jobs",
    "CUPS-Accept-Jobs",
    "CUPS-Reject-Jobs",
    "Set-Printer-Attributes",
    "CUPS-Get-Document",
    "CUPS-Move-Job",
    "Pause-All-Printers",
    "Resume-All-Printers",
    "Restart-System",
    "Restart-Printer",
];

/// Operations never permitted over the network: a `denyAll` default for
/// destructive server-management calls with no IPP semantics of their
/// own. Empty in this deployment: every whitelisted operation has
/// legitimate IPP semantics, gated instead by `RequireAdmin`/
/// `RequireUser` as appropriate.
const DENY_ALL_OPERATIONS: &[&str] = &[];

/// Evaluates policy (`effectiveLimit`) and ownership gates
/// (`canManageJob`/`canManageSubscription`) for one store, given its
/// `_remote_admin`/`_remote_any`/`_user_cancel_any` settings.
pub struct PolicyAdapter<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> PolicyAdapter<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        PolicyAdapter { conn }
    }

    /// The auth limit that applies to `operation` at `path`. Admin-only
    /// operations require `RequireAdmin` unconditionally; everything else
    /// requires at least `RequireUser` unless the store's
    /// `_remote_any`/per-printer ACLs broaden it further (checked later, at
    /// `canManageJob`/`canManageSubscription` time, not here).
    #[instrument(skip(self))]
    pub fn effective_limit(&self, _path: &str, operation: &str) -> AuthLimit {
        if DENY_ALL_OPERATIONS.contains(&operation) {
            return AuthLimit::DenyAll;
        }
        if ADMIN_ONLY_OPERATIONS.contains(&operation) {
            return AuthLimit::RequireAdmin;
        }
        AuthLimit::Anonymous
    }

    /// Resolve the identity for a request, honoring `effective_limit` and
    /// the loopback-only `X-Remote-User` trust rule.
    #[instrument(skip(self, ctx, authenticator))]
    pub fn authorize(
        &self,
        ctx: &RequestContext,
        authenticator: &dyn Authenticator,
    ) -> Result<Identity> {
        let limit = self.effective_limit(&ctx.path, &ctx.operation);
        if limit == AuthLimit::DenyAll {
            return Err(IppError::not_authorized(format!(
                "{} is not permitted over the network",
                ctx.operation
            ))
            .into());
        }

        let identity = self.resolve_identity(ctx, authenticator)?;

        match limit {
            AuthLimit::RequireAdmin if !identity.is_admin => Err(IppError::not_authorized(format!(
                "{} requires administrator privileges",
                ctx.operation
            ))
            .into()),
            AuthLimit::RequireUser if identity.user_name == "anonymous" => {
                Err(IppError::not_authorized(format!("{} requires an authenticated user", ctx.operation)).into())
            }
            _ => Ok(identity),
        }
    }

    fn resolve_identity(&self, ctx: &RequestContext, authenticator: &dyn Authenticator) -> Result<Identity> {
        if let Some(remote_user) = &ctx.remote_user_header {
            if ctx.peer.map(|ip| ip.is_loopback()).unwrap_or(false) {
                let is_admin = self.is_admin(remote_user)?;
                return Ok(Identity {
                    user_name: remote_user.clone(),
                    is_admin,
                });
            }
        }
        if let Some(identity) = authenticator.authenticate(ctx) {
            return Ok(identity);
        }
        if let Some(user) = &ctx.authenticated_user {
            let is_admin = self.is_admin(user)?;
            return Ok(Identity {
                user_name: user.clone(),
                is_admin,
            });
        }
        Ok(Identity::anonymous())
    }

    /// Whether `user` is a member of the admin group. `_remote_admin`
    /// records whether non-loopback admin access is permitted at all; the
    /// membership check itself defers to `sys`/`wheel`-style group lookup
    /// in deployments, stubbed here to the user-list setting an operator
    /// configures the same way printer ACLs are configured.
    pub fn is_admin(&self, user: &str) -> Result<bool> {
        let admins = pressd_store::settings::get_user_list(self.conn, "_admin_users")?;
        Ok(admins.iter().any(|a| a == user))
    }

    pub fn remote_admin_allowed(&self) -> Result<bool> {
        pressd_store::settings::get_bool(self.conn, setting_keys::REMOTE_ADMIN, false)
    }

    pub fn remote_any_allowed(&self) -> Result<bool> {
        pressd_store::settings::get_bool(self.conn, setting_keys::REMOTE_ANY, false)
    }

    fn user_cancel_any_allowed(&self) -> Result<bool> {
        pressd_store::settings::get_bool(self.conn, setting_keys::USER_CANCEL_ANY, false)
    }

    /// Whether `user` (possibly `identity.is_admin`) may cancel, hold, or
    /// otherwise manage `job` /§4.6: the job's own owner
    /// always may; an admin always may; any other user may only when
    /// `_user_cancel_any` is set.
    #[instrument(skip(self, job))]
    pub fn can_manage_job(&self, identity: &Identity, job: &Job) -> Result<bool> {
        if identity.is_admin || identity.user_name == job.user_name {
            return Ok(true);
        }
        self.user_cancel_any_allowed()
    }

    /// Whether `identity` may cancel or renew `subscription`: owner or
    /// admin only, no `_user_cancel_any` broadening (that setting is
    /// job-cancellation-specific).
    pub fn can_manage_subscription(&self, identity: &Identity, subscription: &Subscription) -> bool {
        identity.is_admin || identity.user_name == subscription.owner
    }

    /// Whether `user` may submit a job to a printer with the given
    /// allowed/denied ACLs per-printer `allowed_users`/
    /// `denied_users` invariant: deny list wins if present; otherwise an
    /// empty allow list means "everyone", a non-empty one is exclusive.
    pub fn user_permitted_on_printer(&self, user: &str, printer_id: &str) -> Result<bool> {
        let denied = pressd_store::settings::get_user_list(
            self.conn,
            &setting_keys::printer_denied_users(printer_id),
        )?;
        if denied.iter().any(|d| d == user) {
            return Ok(false);
        }
        let allowed = pressd_store::settings::get_user_list(
            self.conn,
            &setting_keys::printer_allowed_users(printer_id),
        )?;
        Ok(allowed.is_empty() || allowed.iter().any(|a| a == user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressd_core::model::{Job, JobState, SubscriptionDelivery};
    use pressd_ipp::AttributeMap;
    use pressd_store::Store;

    struct DenyAuthenticator;
    impl Authenticator for DenyAuthenticator {
        fn authenticate(&self, _ctx: &RequestContext) -> Option<Identity> {
            None
        }
    }

    fn sample_job(owner: &str) -> Job {
        Job {
            id: 1,
            printer_id: "p1".into(),
            name: "doc".into(),
            user_name: owner.into(),
            submitted_at: Utc::now(),
            completed_at: None,
            state: JobState::Pending,
            state_reason: "none".into(),
            options: AttributeMap::new(),
            impressions: 0,
            priority: 50,
            open_for_documents: false,
        }
    }

    #[test]
    fn admin_only_operation_requires_admin_limit() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                assert_eq!(policy.effective_limit("/printers/p1", "Pause-Printer"), AuthLimit::RequireAdmin);
                assert_eq!(policy.effective_limit("/ipp/print", "Print-Job"), AuthLimit::Anonymous);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn remote_user_header_is_ignored_from_non_loopback_peer() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let ctx = RequestContext {
                    path: "/ipp/print".into(),
                    operation: "Print-Job".into(),
                    peer: Some("203.0.113.5".parse().unwrap()),
                    remote_user_header: Some("root".into()),
                    authenticated_user: None,
                };
                let identity = policy.authorize(&ctx, &DenyAuthenticator).unwrap();
                assert_eq!(identity.user_name, "anonymous");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn remote_user_header_is_trusted_from_loopback_peer() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let ctx = RequestContext {
                    path: "/ipp/print".into(),
                    operation: "Print-Job".into(),
                    peer: Some("127.0.0.1".parse().unwrap()),
                    remote_user_header: Some("alice".into()),
                    authenticated_user: None,
                };
                let identity = policy.authorize(&ctx, &DenyAuthenticator).unwrap();
                assert_eq!(identity.user_name, "alice");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn deny_all_operation_is_always_rejected() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let ctx = RequestContext {
                    path: "/ipp/print".into(),
                    operation: "CUPS-Get-Document".into(),
                    peer: Some("127.0.0.1".parse().unwrap()),
                    remote_user_header: None,
                    authenticated_user: Some("alice".into()),
                };
                let err = policy.authorize(&ctx, &DenyAuthenticator).unwrap_err();
                assert_eq!(err.as_ipp_kind(), pressd_core::error::IppErrorKind::NotAuthorized);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn owner_can_manage_own_job_without_user_cancel_any() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let identity = Identity {
                    user_name: "alice".into(),
                    is_admin: false,
                };
                assert!(policy.can_manage_job(&identity, &sample_job("alice")).unwrap());
                assert!(!policy.can_manage_job(&identity, &sample_job("bob")).unwrap());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn user_cancel_any_broadens_job_management() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| pressd_store::settings::set(tx, setting_keys::USER_CANCEL_ANY, "true"))
            .unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let identity = Identity {
                    user_name: "alice".into(),
                    is_admin: false,
                };
                assert!(policy.can_manage_job(&identity, &sample_job("bob")).unwrap());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn subscription_management_is_owner_or_admin_only_regardless_of_user_cancel_any() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| pressd_store::settings::set(tx, setting_keys::USER_CANCEL_ANY, "true"))
            .unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                let sub = Subscription {
                    id: 1,
                    owner: "bob".into(),
                    printer_id: Some("p1".into()),
                    job_id: None,
                    events: vec!["job-state-changed".into()],
                    lease_seconds: 3600,
                    recipient: SubscriptionDelivery::Pull,
                    time_interval: 0,
                    user_data: Vec::new(),
                    created_at: Utc::now(),
                };
                let identity = Identity {
                    user_name: "alice".into(),
                    is_admin: false,
                };
                assert!(!policy.can_manage_subscription(&identity, &sub));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn printer_acl_denied_list_wins_over_empty_allow_list() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| pressd_store::settings::set(tx, &setting_keys::printer_denied_users("p1"), "bob"))
            .unwrap();
        store
            .with_tx_read(|tx| {
                let policy = PolicyAdapter::new(tx);
                assert!(!policy.user_permitted_on_printer("bob", "p1").unwrap());
                assert!(policy.user_permitted_on_printer("alice", "p1").unwrap());
                Ok(())
            })
            .unwrap();
    }
}
