use uuid::Uuid;

use crate::types::Principal;

/// The principal a request acts as, plus the one it arrived with when an
/// administrator has been substituted in.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Principal,
    pub original: Option<Principal>,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(actor: Principal) -> Self {
        Self {
            actor,
            original: None,
            request_id: Uuid::new_v4(),
        }
    }

    /// Replaces the actor, remembering who originally triggered the request.
    /// Substituting twice keeps the first original.
    #[must_use]
    pub fn with_substitute(mut self, substitute: Principal) -> Self {
        let previous = std::mem::replace(&mut self.actor, substitute);
        self.original.get_or_insert(previous);
        self
    }

    #[must_use]
    pub fn is_substituted(&self) -> bool {
        self.original.is_some()
    }
}
