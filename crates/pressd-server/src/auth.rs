// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concrete `Authenticator`. This deployment has no credential scheme of its
// own — Kerberos, client-cert, and Digest are named external collaborators —
// the HTTP layer already decodes `Authorization: Basic` into
// `RequestContext::authenticated_user` before `PolicyAdapter::authorize`
// runs, so this implementation always defers to that rather than performing
// a second, redundant check.

use pressd_dispatch::{Authenticator, Identity, RequestContext};

pub struct NetworkAuthenticator;

impl Authenticator for NetworkAuthenticator {
    fn authenticate(&self, _ctx: &RequestContext) -> Option<Identity> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_defers_to_the_http_layer() {
        let ctx = RequestContext {
            path: "/ipp/print".to_string(),
            operation: "Print-Job".to_string(),
            peer: None,
            remote_user_header: None,
            authenticated_user: Some("alice".to_string()),
        };
        assert!(NetworkAuthenticator.authenticate(&ctx).is_none());
    }
}
