//! Who is acting. The authentication layer lives elsewhere; the ledger only
//! needs a name to stamp on transactions and an id for the activity log.

use std::sync::RwLock;

use stores_core::Actor;

/// Supplies the currently signed-in actor.
pub trait ActorProvider: Send + Sync {
    fn current_actor(&self) -> Actor;
}

/// An actor that changes on sign-in / sign-out.
#[derive(Debug, Default)]
pub struct SessionActor {
    actor: RwLock<Actor>,
}

impl SessionActor {
    pub fn new(actor: Actor) -> Self {
        SessionActor {
            actor: RwLock::new(actor),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Actor::anonymous())
    }

    pub fn sign_in(&self, actor: Actor) {
        *self.actor.write().unwrap_or_else(|p| p.into_inner()) = actor;
    }

    pub fn sign_out(&self) {
        self.sign_in(Actor::anonymous());
    }
}

impl ActorProvider for SessionActor {
    fn current_actor(&self) -> Actor {
        self.actor.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
