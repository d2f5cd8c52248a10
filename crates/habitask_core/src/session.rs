//! Active-actor context.
//!
//! # Responsibility
//! - Hold the currently signed-in actor, if any.
//! - Broadcast login, logout and profile changes to bound stores.
//!
//! # Invariants
//! - The session is the only writer of the active actor; stores read it.
//! - Every state change emits exactly one `ActorChange`.

use crate::model::ActorId;
use crate::observer::{ListenerKey, Listeners};
use log::info;
use std::cell::RefCell;
use std::rc::Rc;

/// Signed-in end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub email: String,
    pub profile_color: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            display_name: display_name.into(),
            email: String::new(),
            profile_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorChange {
    LoggedIn(Actor),
    ProfileUpdated(Actor),
    LoggedOut,
}

/// Cloneable handle; clones share one session.
#[derive(Clone, Default)]
pub struct ActorSession {
    inner: Rc<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    actor: RefCell<Option<Actor>>,
    listeners: Listeners<ActorChange>,
}

impl ActorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session that starts signed in, without emitting an event.
    pub fn signed_in(actor: Actor) -> Self {
        let session = Self::default();
        session.inner.actor.replace(Some(actor));
        session
    }

    pub fn current_actor(&self) -> Option<Actor> {
        self.inner.actor.borrow().clone()
    }

    pub fn current_actor_id(&self) -> Option<ActorId> {
        self.inner
            .actor
            .borrow()
            .as_ref()
            .map(|actor| actor.id.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.actor.borrow().is_some()
    }

    pub fn login(&self, actor: Actor) {
        info!("event=session_login module=session status=ok actor={}", actor.id);
        self.inner.actor.replace(Some(actor.clone()));
        self.inner.listeners.notify(&ActorChange::LoggedIn(actor));
    }

    pub fn update_profile(&self, actor: Actor) {
        info!("event=session_profile module=session status=ok actor={}", actor.id);
        self.inner.actor.replace(Some(actor.clone()));
        self.inner
            .listeners
            .notify(&ActorChange::ProfileUpdated(actor));
    }

    pub fn logout(&self) {
        let previous = self.inner.actor.replace(None);
        info!(
            "event=session_logout module=session status=ok had_actor={}",
            previous.is_some()
        );
        self.inner.listeners.notify(&ActorChange::LoggedOut);
    }

    /// Registers `listener` for future changes. The current actor is not
    /// replayed; read it with `current_actor`.
    pub fn subscribe(&self, listener: impl Fn(&ActorChange) + 'static) -> ListenerKey {
        self.inner.listeners.insert(Rc::new(listener))
    }

    pub fn unsubscribe(&self, key: ListenerKey) -> bool {
        self.inner.listeners.remove(key)
    }
}
