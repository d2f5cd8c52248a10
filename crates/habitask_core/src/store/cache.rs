//! Actor-scoped entity cache with optimistic-then-reconciled mutations.
//!
//! # Responsibility
//! - Hold the ordered in-memory snapshot of one collection for the active
//!   actor and push every change to subscribers.
//! - Forward mutations to the gateway and fold confirmed documents back in.
//! - Schedule one statistics recompute per successful mutation.
//!
//! # Invariants
//! - Every entity in the snapshot is owned by the actor it was loaded for.
//! - `update` and `delete` touch the snapshot only after the gateway
//!   confirms; on failure the snapshot is exactly what it was before.
//! - No `RefCell` borrow is held across an `.await` or a listener call.
//! - A load whose epoch was superseded (newer load, logout) is discarded.
//! - A failed `complete` rolls back only within the epoch it started in.

use super::error::{StoreError, StoreResult};
use crate::clock::Clock;
use crate::gateway::{CollectionGateway, ListFilter};
use crate::model::{ActorId, Document, EntityId, ValidationError};
use crate::observer::{Listener, ListenerKey, Listeners};
use crate::session::{ActorChange, ActorSession};
use crate::stats::trigger::StatsTrigger;
use chrono::{DateTime, Utc};
use im::Vector;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::Instant;

/// Document kinds managed by an `EntityCache`.
pub trait Entity: Document + PartialEq + Debug {
    /// Caller-supplied fields of a new entity.
    type Draft;
    /// Shallow partial update.
    type Patch;

    /// Builds a new, not yet persisted entity owned by `owner`.
    fn from_draft(draft: Self::Draft, owner: ActorId, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);

    fn validate(&self) -> Result<(), ValidationError>;

    /// Primary text (title or name) and optional description, for `search`.
    fn search_fields(&self) -> (&str, Option<&str>);
}

/// Cache lifecycle: `Unloaded -> Loading -> Ready`, back to `Loading` on
/// refresh or actor change, and to `Unloaded` on logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
}

struct CacheState<E: Entity> {
    snapshot: Vector<E>,
    load_state: LoadState,
    epoch: u64,
}

pub struct EntityCache<E: Entity, G> {
    pub(super) gateway: Rc<G>,
    pub(super) session: ActorSession,
    pub(super) clock: Rc<dyn Clock>,
    pub(super) trigger: StatsTrigger,
    state: RefCell<CacheState<E>>,
    listeners: Listeners<Vector<E>>,
}

impl<E: Entity, G> EntityCache<E, G> {
    pub fn new(
        gateway: Rc<G>,
        session: ActorSession,
        clock: Rc<dyn Clock>,
        trigger: StatsTrigger,
    ) -> Self {
        Self {
            gateway,
            session,
            clock,
            trigger,
            state: RefCell::new(CacheState {
                snapshot: Vector::new(),
                load_state: LoadState::Unloaded,
                epoch: 0,
            }),
            listeners: Listeners::default(),
        }
    }

    /// Current snapshot. Never blocks and never touches the network.
    pub fn snapshot(&self) -> Vector<E> {
        self.state.borrow().snapshot.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state.borrow().load_state
    }

    pub fn is_loading(&self) -> bool {
        self.load_state() == LoadState::Loading
    }

    pub fn find(&self, id: &EntityId) -> Option<E> {
        let state = self.state.borrow();
        position(&state.snapshot, id).map(|index| state.snapshot[index].clone())
    }

    /// Entities of the snapshot matching `predicate`, in snapshot order.
    pub fn filtered(&self, predicate: impl Fn(&E) -> bool) -> Vector<E> {
        self.snapshot()
            .into_iter()
            .filter(|entity| predicate(entity))
            .collect()
    }

    /// Case-insensitive substring match over the primary text and the
    /// description. A blank query returns the whole snapshot.
    pub fn search(&self, query: &str) -> Vector<E> {
        if query.trim().is_empty() {
            return self.snapshot();
        }
        let needle = query.to_lowercase();
        self.filtered(|entity| {
            let (primary, description) = entity.search_fields();
            primary.to_lowercase().contains(&needle)
                || description.is_some_and(|text| text.to_lowercase().contains(&needle))
        })
    }

    /// Registers `listener`; it is called at once with the current snapshot
    /// and then after every change.
    pub fn subscribe(&self, listener: impl Fn(&Vector<E>) + 'static) -> ListenerKey {
        let listener: Listener<Vector<E>> = Rc::new(listener);
        let key = self.listeners.insert(Rc::clone(&listener));
        listener(&self.snapshot());
        key
    }

    pub fn unsubscribe(&self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drops every entity and returns to `Unloaded`. In-flight loads are
    /// invalidated.
    pub fn clear(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.epoch += 1;
            state.load_state = LoadState::Unloaded;
            state.snapshot = Vector::new();
        }
        debug!(
            "event=store_clear module=store status=ok collection={}",
            E::COLLECTION
        );
        self.listeners.notify(&Vector::new());
    }

    /// Bumped by every load, refresh and clear.
    pub(super) fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub(super) fn publish(&self, snapshot: Vector<E>) {
        self.state.borrow_mut().snapshot = snapshot.clone();
        self.listeners.notify(&snapshot);
    }

    /// Replaces the entity with `id` if it is still cached.
    pub(super) fn replace_entry(&self, id: &EntityId, entity: E) -> bool {
        let current = self.snapshot();
        match position(&current, id) {
            Some(index) => {
                self.publish(current.update(index, entity));
                true
            }
            None => false,
        }
    }

    /// Drops entities not owned by `actor_id`; publishes only on change.
    fn retain_owned(&self, actor_id: &ActorId) {
        let current = self.snapshot();
        let owned = keep_owned(current.clone(), actor_id);
        if owned.len() != current.len() {
            self.publish(owned);
        }
    }

    fn begin_load(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        state.load_state = LoadState::Loading;
        state.epoch
    }

    /// Settles a load started at `epoch`. Returns `false` when the load was
    /// superseded and its result ignored.
    fn finish_load(&self, epoch: u64, snapshot: Option<Vector<E>>) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.epoch != epoch {
                return false;
            }
            state.load_state = LoadState::Ready;
        }
        if let Some(snapshot) = snapshot {
            self.publish(snapshot);
        }
        true
    }
}

impl<E: Entity, G: CollectionGateway<E>> EntityCache<E, G> {
    /// Loads the snapshot of `actor_id`. A gateway failure is logged and
    /// yields an empty `Ready` snapshot.
    pub async fn load(&self, actor_id: &ActorId) {
        let epoch = self.begin_load();
        self.load_epoch(epoch, actor_id).await;
    }

    async fn load_epoch(&self, epoch: u64, actor_id: &ActorId) {
        let started_at = Instant::now();
        let filter = ListFilter::owned_by(actor_id.clone());

        let snapshot = match self.gateway.list(&filter).await {
            Ok(entities) => {
                let owned = keep_owned(entities.into_iter().collect(), actor_id);
                info!(
                    "event=store_load module=store status=ok collection={} actor={actor_id} count={} duration_ms={}",
                    E::COLLECTION,
                    owned.len(),
                    started_at.elapsed().as_millis()
                );
                owned
            }
            Err(err) => {
                error!(
                    "event=store_load module=store status=error collection={} actor={actor_id} error={err}",
                    E::COLLECTION
                );
                Vector::new()
            }
        };

        if !self.finish_load(epoch, Some(snapshot)) {
            debug!(
                "event=store_load module=store status=skip collection={} actor={actor_id} reason=superseded",
                E::COLLECTION
            );
        }
    }

    /// Reloads for the active actor, reporting failures to the caller. On
    /// failure the snapshot is left as it was.
    ///
    /// Returns the fetched list. If a newer load or a logout superseded this
    /// refresh, the list is returned but not cached.
    pub async fn refresh(&self) -> StoreResult<Vector<E>> {
        let actor_id = self
            .session
            .current_actor_id()
            .ok_or(StoreError::NotAuthenticated)?;
        let epoch = self.begin_load();

        match self.gateway.list(&ListFilter::owned_by(actor_id.clone())).await {
            Ok(entities) => {
                let owned = keep_owned(entities.into_iter().collect(), &actor_id);
                if !self.finish_load(epoch, Some(owned.clone())) {
                    debug!(
                        "event=store_refresh module=store status=skip collection={} actor={actor_id} reason=superseded",
                        E::COLLECTION
                    );
                }
                Ok(owned)
            }
            Err(err) => {
                error!(
                    "event=store_refresh module=store status=error collection={} actor={actor_id} error={err}",
                    E::COLLECTION
                );
                self.finish_load(epoch, None);
                Err(err.into())
            }
        }
    }

    /// Creates an entity for the active actor and appends the confirmed
    /// document.
    pub async fn add(&self, draft: E::Draft) -> StoreResult<E> {
        let owner = self
            .session
            .current_actor_id()
            .ok_or(StoreError::NotAuthenticated)?;
        let entity = E::from_draft(draft, owner.clone(), self.clock.now());
        entity.validate()?;

        let created = self.gateway.create(&entity).await.inspect_err(|err| {
            error!(
                "event=store_add module=store status=error collection={} error={err}",
                E::COLLECTION
            );
        })?;

        if self.session.current_actor_id().as_ref() == Some(&owner) {
            let mut next = self.snapshot();
            next.push_back(created.clone());
            self.publish(next);
        } else {
            warn!(
                "event=store_add module=store status=skip collection={} reason=actor_changed",
                E::COLLECTION
            );
        }
        info!(
            "event=store_add module=store status=ok collection={} id={}",
            E::COLLECTION,
            display_id(&created)
        );
        self.trigger.fire(E::COLLECTION);
        Ok(created)
    }

    /// Merges `patch` over the cached entity and persists the result.
    pub async fn update(&self, id: &EntityId, patch: E::Patch) -> StoreResult<E> {
        let mut merged = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        merged.apply_patch(patch);
        merged.validate()?;

        let saved = self.gateway.replace(id, &merged).await.inspect_err(|err| {
            error!(
                "event=store_update module=store status=error collection={} id={id} error={err}",
                E::COLLECTION
            );
        })?;

        if !self.replace_entry(id, saved.clone()) {
            warn!(
                "event=store_update module=store status=skip collection={} id={id} reason=evicted",
                E::COLLECTION
            );
        }
        info!(
            "event=store_update module=store status=ok collection={} id={id}",
            E::COLLECTION
        );
        self.trigger.fire(E::COLLECTION);
        Ok(saved)
    }

    /// Removes `id` remotely, then from the snapshot.
    pub async fn delete(&self, id: &EntityId) -> StoreResult<()> {
        self.gateway.remove(id).await.inspect_err(|err| {
            error!(
                "event=store_delete module=store status=error collection={} id={id} error={err}",
                E::COLLECTION
            );
        })?;

        let remaining = self.filtered(|entity| entity.id() != Some(id));
        self.publish(remaining);
        info!(
            "event=store_delete module=store status=ok collection={} id={id}",
            E::COLLECTION
        );
        self.trigger.fire(E::COLLECTION);
        Ok(())
    }
}

impl<E: Entity, G: CollectionGateway<E> + 'static> EntityCache<E, G> {
    /// Follows `session`: loads for the signed-in actor now (if any), reloads
    /// on login and profile change, clears on logout.
    ///
    /// Loads are spawned with `tokio::task::spawn_local`, so this must run
    /// inside a `LocalSet`.
    pub fn bind_session(self: &Rc<Self>) -> ListenerKey {
        if let Some(actor_id) = self.session.current_actor_id() {
            spawn_load(Rc::clone(self), actor_id);
        }

        let weak = Rc::downgrade(self);
        self.session.subscribe(move |change| {
            let Some(cache) = weak.upgrade() else {
                return;
            };
            match change {
                ActorChange::LoggedIn(actor) | ActorChange::ProfileUpdated(actor) => {
                    cache.retain_owned(&actor.id);
                    spawn_load(cache, actor.id.clone());
                }
                ActorChange::LoggedOut => cache.clear(),
            }
        })
    }
}

fn spawn_load<E, G>(cache: Rc<EntityCache<E, G>>, actor_id: ActorId)
where
    E: Entity,
    G: CollectionGateway<E> + 'static,
{
    let epoch = cache.begin_load();
    tokio::task::spawn_local(async move {
        cache.load_epoch(epoch, &actor_id).await;
    });
}

pub(crate) fn position<E: Document>(snapshot: &Vector<E>, id: &EntityId) -> Option<usize> {
    snapshot.iter().position(|entity| entity.id() == Some(id))
}

fn keep_owned<E: Entity>(entities: Vector<E>, actor_id: &ActorId) -> Vector<E> {
    let total = entities.len();
    let owned: Vector<E> = entities
        .into_iter()
        .filter(|entity| entity.owner_id() == Some(actor_id))
        .collect();
    if owned.len() != total {
        warn!(
            "event=store_scope module=store status=ok collection={} actor={actor_id} dropped={}",
            E::COLLECTION,
            total - owned.len()
        );
    }
    owned
}

fn display_id<D: Document>(document: &D) -> &str {
    document.id().map_or("<unassigned>", EntityId::as_str)
}
