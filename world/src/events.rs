//! Handler registries and the fault-isolating event dispatcher.
//!
//! Game content attaches handlers to boards, timers, the player and actor
//! instances through an [`EventHandlerCollection`]. Every dispatch iterates a
//! private [`HandlerSnapshot`] taken before the first handler runs, so a
//! handler may register or remove handlers, or trigger further dispatches
//! through its [`EventContext`], without disturbing the dispatch in progress.
//! A handler that returns an error or panics is reported as a
//! [`HandlerFault`] and the remaining handlers still run.

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use thiserror::Error;
use tile_adventure_core::{ActorInstanceId, Coordinate, EventKind, EventResult, WorldEvent};
use tracing::{trace, warn};

use crate::{
    actor::{ActorInstance, Roster},
    board::{Board, BoardError, MoveOutcome},
    layer::Sprite,
    player::Player,
};

/// Identifier returned when a handler is registered with a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Game-content callback invoked for one event type.
///
/// Closures with the matching signature implement this trait; handlers that
/// carry their own state can implement it directly and be registered with
/// [`EventHandlerCollection::register_handler`].
pub trait EventHandler<E: WorldEvent>: Send + Sync + 'static {
    /// Reacts to the event. Errors are isolated by the dispatcher.
    fn handle(&self, context: &mut EventContext<'_>, event: &E) -> anyhow::Result<EventResult>;
}

impl<E, F> EventHandler<E> for F
where
    E: WorldEvent,
    F: Fn(&mut EventContext<'_>, &E) -> anyhow::Result<EventResult> + Send + Sync + 'static,
{
    fn handle(&self, context: &mut EventContext<'_>, event: &E) -> anyhow::Result<EventResult> {
        self(context, event)
    }
}

struct TypedHandler<E> {
    inner: Box<dyn EventHandler<E>>,
}

pub(crate) type ErasedHandler = Arc<dyn Any + Send + Sync>;

fn erase<E, H>(handler: H) -> ErasedHandler
where
    E: WorldEvent,
    H: EventHandler<E>,
{
    Arc::new(TypedHandler::<E> {
        inner: Box::new(handler),
    })
}

struct Registration {
    id: HandlerId,
    name: Arc<str>,
    handler: ErasedHandler,
}

/// Per-entity registry mapping event kinds to ordered handler lists.
#[derive(Default)]
pub struct EventHandlerCollection {
    registrations: BTreeMap<EventKind, Vec<Registration>>,
    next_id: u64,
}

impl EventHandlerCollection {
    /// Creates a collection without handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a closure for events of type `E` under a persistable name.
    pub fn register<E, F>(&mut self, name: impl Into<String>, handler: F) -> HandlerId
    where
        E: WorldEvent,
        F: Fn(&mut EventContext<'_>, &E) -> anyhow::Result<EventResult> + Send + Sync + 'static,
    {
        self.register_handler::<E, F>(name, handler)
    }

    /// Registers a handler value for events of type `E` under a persistable name.
    pub fn register_handler<E, H>(&mut self, name: impl Into<String>, handler: H) -> HandlerId
    where
        E: WorldEvent,
        H: EventHandler<E>,
    {
        self.insert(E::KIND, name.into(), erase::<E, H>(handler))
    }

    pub(crate) fn insert(
        &mut self,
        kind: EventKind,
        name: String,
        handler: ErasedHandler,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.registrations
            .entry(kind)
            .or_default()
            .push(Registration {
                id,
                name: name.into(),
                handler,
            });
        id
    }

    /// Removes a registration. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        for handlers in self.registrations.values_mut() {
            if let Some(position) = handlers.iter().position(|entry| entry.id == id) {
                let _ = handlers.remove(position);
                return true;
            }
        }
        false
    }

    /// Number of handlers registered for the kind.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registrations.get(&kind).map_or(0, Vec::len)
    }

    /// Reports whether no handler is registered for any kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.values().all(Vec::is_empty)
    }

    /// Iterates registrations grouped by kind, each group in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = (EventKind, HandlerId, &str)> {
        self.registrations.iter().flat_map(|(kind, handlers)| {
            handlers
                .iter()
                .map(move |entry| (*kind, entry.id, entry.name.as_ref()))
        })
    }

    /// Captures the handlers currently registered for `E`.
    #[must_use]
    pub fn snapshot<E: WorldEvent>(&self) -> HandlerSnapshot<E> {
        let entries = self
            .registrations
            .get(&E::KIND)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                Arc::clone(&entry.handler)
                    .downcast::<TypedHandler<E>>()
                    .ok()
                    .map(|handler| SnapshotEntry {
                        id: entry.id,
                        name: Arc::clone(&entry.name),
                        handler,
                    })
            })
            .collect();
        HandlerSnapshot { entries }
    }

    /// Dispatches the event to a snapshot of this collection's handlers.
    ///
    /// Use [`HandlerSnapshot::invoke`] instead when the collection lives inside
    /// the board or player that the context borrows.
    pub fn invoke<E: WorldEvent>(&self, context: &mut EventContext<'_>, event: &E) -> Dispatch {
        self.snapshot::<E>().invoke(context, event)
    }
}

impl fmt::Debug for EventHandlerCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.registrations()
                    .map(|(kind, id, name)| (kind, id.get(), name.to_owned())),
            )
            .finish()
    }
}

struct SnapshotEntry<E> {
    id: HandlerId,
    name: Arc<str>,
    handler: Arc<TypedHandler<E>>,
}

/// Handlers captured for one dispatch, detached from the owning collection.
pub struct HandlerSnapshot<E> {
    entries: Vec<SnapshotEntry<E>>,
}

impl<E: WorldEvent> HandlerSnapshot<E> {
    /// Snapshot without handlers, used when an entity has no collection.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of captured handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no handler was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes every captured handler in registration order.
    ///
    /// Each handler runs behind its own failure boundary: an `Err` or a panic is
    /// logged, recorded in the returned [`Dispatch`], and does not stop the
    /// remaining handlers.
    pub fn invoke(&self, context: &mut EventContext<'_>, event: &E) -> Dispatch {
        trace!(kind = %E::KIND, handlers = self.entries.len(), "dispatching event");

        let mut dispatch = Dispatch::default();
        for entry in &self.entries {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.handler.inner.handle(context, event)
            }));
            match outcome {
                Ok(Ok(result)) => dispatch.result = dispatch.result.combine(result),
                Ok(Err(error)) => {
                    let cause = FaultCause::Error(format!("{error:#}"));
                    dispatch.record_fault(entry.id, &entry.name, E::KIND, cause);
                }
                Err(payload) => {
                    let cause = FaultCause::Panic(panic_message(payload.as_ref()));
                    dispatch.record_fault(entry.id, &entry.name, E::KIND, cause);
                }
            }
        }
        dispatch
    }
}

impl<E: WorldEvent> fmt::Debug for HandlerSnapshot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSnapshot")
            .field("kind", &E::KIND)
            .field("handlers", &self.entries.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Aggregated outcome of dispatching one event.
#[derive(Debug, Default)]
pub struct Dispatch {
    result: EventResult,
    faults: Vec<HandlerFault>,
}

impl Dispatch {
    /// Combined result of every handler that completed normally.
    #[must_use]
    pub const fn result(&self) -> EventResult {
        self.result
    }

    /// Faults raised by handlers during the dispatch, in invocation order.
    #[must_use]
    pub fn faults(&self) -> &[HandlerFault] {
        &self.faults
    }

    /// Consumes the dispatch, keeping only the combined result.
    #[must_use]
    pub fn into_result(self) -> EventResult {
        self.result
    }

    fn record_fault(
        &mut self,
        handler_id: HandlerId,
        name: &str,
        kind: EventKind,
        cause: FaultCause,
    ) {
        warn!(
            handler = name,
            handler_id = handler_id.get(),
            kind = %kind,
            cause = %cause,
            "event handler failed; continuing dispatch"
        );
        self.faults.push(HandlerFault {
            handler_id,
            handler_name: name.to_owned(),
            kind,
            cause,
        });
    }
}

/// Failure raised by a single handler and contained by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("handler `{handler_name}` failed while handling {kind}: {cause}")]
pub struct HandlerFault {
    /// Registration that failed.
    pub handler_id: HandlerId,
    /// Name the handler was registered under.
    pub handler_name: String,
    /// Kind of event being dispatched.
    pub kind: EventKind,
    /// What went wrong.
    pub cause: FaultCause,
}

/// How a handler failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FaultCause {
    /// The handler returned an error.
    #[error("returned error: {0}")]
    Error(String),
    /// The handler panicked.
    #[error("panicked: {0}")]
    Panic(String),
}

/// Mutable view of the world handed to handlers during a dispatch.
///
/// Operations performed through the context dispatch their own events
/// synchronously, nested inside the dispatch that invoked the handler.
pub struct EventContext<'a> {
    board: &'a mut Board,
    player: &'a mut Player,
    roster: &'a mut Roster,
}

impl<'a> EventContext<'a> {
    /// Creates a context over the board where the event happened.
    pub(crate) fn new(
        board: &'a mut Board,
        player: &'a mut Player,
        roster: &'a mut Roster,
    ) -> Self {
        Self {
            board,
            player,
            roster,
        }
    }

    /// Board on which the event happened.
    #[must_use]
    pub fn board(&self) -> &Board {
        &*self.board
    }

    /// Mutable access to the board on which the event happened.
    pub fn board_mut(&mut self) -> &mut Board {
        &mut *self.board
    }

    /// The session's player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &*self.player
    }

    /// Mutable access to the player's appearance and handlers.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut *self.player
    }

    /// Attempts to move an actor instance on the context's board.
    pub fn try_move_actor_instance(
        &mut self,
        actor_instance_id: ActorInstanceId,
        destination: Coordinate,
    ) -> Result<MoveOutcome, BoardError> {
        self.board.try_move_actor_instance(
            self.player,
            self.roster,
            actor_instance_id,
            destination,
        )
    }

    /// Attempts to move the player within the context's board.
    pub fn try_move_player(&mut self, destination: Coordinate) -> Result<MoveOutcome, BoardError> {
        self.board
            .try_move_player(self.player, self.roster, destination)
    }

    /// Places a new actor instance on the context's board.
    ///
    /// The identifier must not be placed on any board of the world.
    pub fn add_actor_instance(
        &mut self,
        actor_instance: ActorInstance,
    ) -> Result<EventResult, BoardError> {
        self.board
            .add_actor_instance(self.player, self.roster, actor_instance)
    }

    /// Removes an actor instance from the context's board.
    pub fn remove_actor_instance(
        &mut self,
        actor_instance_id: ActorInstanceId,
    ) -> Result<(ActorInstance, EventResult), BoardError> {
        self.board
            .remove_actor_instance(self.player, self.roster, actor_instance_id)
    }

    /// Writes or clears a foreground sprite on the context's board.
    pub fn set_foreground_sprite(
        &mut self,
        coordinate: Coordinate,
        sprite: Option<Sprite>,
    ) -> Result<Option<Sprite>, BoardError> {
        self.board
            .set_foreground_sprite(&*self.player, coordinate, sprite)
    }
}

impl fmt::Debug for EventContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("board", &self.board.id())
            .field("player", &self.player.id())
            .finish()
    }
}

struct CatalogEntry {
    kind: EventKind,
    handler: ErasedHandler,
}

/// Named handlers a host makes available when loading persisted registrations.
#[derive(Default)]
pub struct HandlerCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a closure available under `name`, replacing any earlier entry.
    pub fn register<E, F>(&mut self, name: impl Into<String>, handler: F)
    where
        E: WorldEvent,
        F: Fn(&mut EventContext<'_>, &E) -> anyhow::Result<EventResult> + Send + Sync + 'static,
    {
        self.register_handler::<E, F>(name, handler);
    }

    /// Makes a handler value available under `name`, replacing any earlier entry.
    pub fn register_handler<E, H>(&mut self, name: impl Into<String>, handler: H)
    where
        E: WorldEvent,
        H: EventHandler<E>,
    {
        let _ = self.entries.insert(
            name.into(),
            CatalogEntry {
                kind: E::KIND,
                handler: erase::<E, H>(handler),
            },
        );
    }

    /// Reports whether a handler is available under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<(EventKind, ErasedHandler)> {
        self.entries
            .get(name)
            .map(|entry| (entry.kind, Arc::clone(&entry.handler)))
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("HandlerCatalog").field("names", &names).finish()
    }
}
