use std::sync::Arc;

use tracing::{debug, info};

use super::resolver::AccessResolver;
use crate::context::RequestContext;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Capability, Principal, Repository};

/// Picks an acting administrator for automation paths whose triggering
/// principal cannot administer the repository itself.
#[derive(Clone)]
pub struct ActorSubstitution {
    store: Arc<dyn Store>,
    resolver: AccessResolver,
}

impl ActorSubstitution {
    pub fn new(store: Arc<dyn Store>, resolver: AccessResolver) -> Self {
        Self { store, resolver }
    }

    /// Returns the first active principal holding admin on `repo`, the pinned
    /// owner preferred. `None` means the caller must deny.
    pub fn substitute(
        &self,
        triggering: &Principal,
        repo: &Repository,
    ) -> Result<Option<Principal>> {
        for record in self.resolver.cache().list_by_repo(&repo.uid)? {
            if !record.admin() {
                continue;
            }
            match self.store.find_principal(record.user_id)? {
                Some(candidate) if candidate.active => return Ok(Some(candidate)),
                Some(candidate) => {
                    debug!(
                        login = %candidate.login,
                        triggering = %triggering.login,
                        repo = %repo.slug(),
                        "skipping inactive administrator"
                    );
                }
                None => {}
            }
        }
        Ok(None)
    }

    /// The context downstream work should run under. Unchanged when the actor
    /// already administers `repo`. Only active machine accounts are ever
    /// substituted; everyone else gets `None`, as does a machine account when
    /// nobody can stand in.
    pub fn effective_actor(
        &self,
        ctx: RequestContext,
        repo: &Repository,
    ) -> Result<Option<RequestContext>> {
        if !ctx.actor.active {
            return Ok(None);
        }

        if self
            .resolver
            .resolve(&ctx.actor, repo, Capability::Admin)?
            .is_granted()
        {
            return Ok(Some(ctx));
        }

        if !ctx.actor.machine {
            debug!(login = %ctx.actor.login, repo = %repo.slug(), "substitution refused for non-automation principal");
            return Ok(None);
        }

        let Some(substitute) = self.substitute(&ctx.actor, repo)? else {
            return Ok(None);
        };

        info!(
            request_id = %ctx.request_id,
            repo = %repo.slug(),
            triggering = %ctx.actor.login,
            actor = %substitute.login,
            "substituting repository administrator"
        );
        Ok(Some(ctx.with_substitute(substitute)))
    }
}
