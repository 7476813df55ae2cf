use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use tile_adventure_core::{
    ActorId, ActorInstanceCreatedEvent, ActorInstanceId, ActorInstanceMovedEvent, BoardId,
    Character, Color, Coordinate, EventResult, PlayerId, Size,
};
use tile_adventure_world::{
    query, ActorInstance, Board, EventHandlerCollection, HandlerId, MoveOutcome, Player, Tile,
    World,
};

const FIELD: BoardId = BoardId::from_u128(7);
const LEADER: ActorInstanceId = ActorInstanceId::from_u128(1);
const FOLLOWER: ActorInstanceId = ActorInstanceId::from_u128(2);

type Log = Arc<Mutex<Vec<String>>>;

fn glyph(symbol: char) -> Character {
    Character::new(symbol, Color::YELLOW, Color::BLACK)
}

fn actor(id: ActorInstanceId, x: i32, y: i32) -> ActorInstance {
    ActorInstance::new(
        id,
        ActorId::from_u128(1),
        FIELD,
        "Duckling",
        Coordinate::new(x, y),
        glyph('d'),
    )
}

fn field() -> World {
    let board = Board::new(FIELD, "Field", "", Size::new(5, 1));
    let player = Player::new(
        PlayerId::from_u128(1),
        FIELD,
        Coordinate::new(4, 0),
        glyph('@'),
    );
    World::new(vec![board], player).expect("valid world")
}

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().expect("log lock").push(entry.into());
}

#[test]
fn handler_can_move_another_actor_during_dispatch() {
    let log = Log::default();
    let mut world = field();
    let mut follower_handlers = EventHandlerCollection::new();
    let follower_log = Arc::clone(&log);
    let _ = follower_handlers.register::<ActorInstanceMovedEvent, _>("waddle", move |_, event| {
        push(&follower_log, format!("follower moved to {}", event.to));
        Ok(EventResult::Completed)
    });
    let mut leader_handlers = EventHandlerCollection::new();
    let leader_log = Arc::clone(&log);
    let _ = leader_handlers.register::<ActorInstanceMovedEvent, _>(
        "lead",
        move |context, event| {
            push(&leader_log, format!("leader moved to {}", event.to));
            let outcome = context.try_move_actor_instance(FOLLOWER, event.from)?;
            Ok(if outcome.succeeded() {
                EventResult::Completed
            } else {
                EventResult::Canceled
            })
        },
    );
    let _ = world
        .add_actor_instance(actor(LEADER, 1, 0).with_event_handlers(leader_handlers))
        .expect("free cell");
    let _ = world
        .add_actor_instance(actor(FOLLOWER, 0, 0).with_event_handlers(follower_handlers))
        .expect("free cell");

    let outcome = world
        .try_move_actor_instance(LEADER, Coordinate::new(2, 0))
        .expect("valid request");

    assert_eq!(
        outcome,
        MoveOutcome::Moved {
            from: Coordinate::new(1, 0),
            to: Coordinate::new(2, 0),
            result: EventResult::Completed,
        }
    );
    assert_eq!(
        query::actor_instance(&world, FOLLOWER).map(Tile::coordinate),
        Some(Coordinate::new(1, 0))
    );
    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["leader moved to (2, 0)", "follower moved to (1, 0)"]
    );
}

#[test]
fn registrations_made_during_dispatch_apply_to_later_dispatches() {
    let log = Log::default();
    let mut world = field();
    let mut handlers = EventHandlerCollection::new();
    let outer_log = Arc::clone(&log);
    let _ = handlers.register::<ActorInstanceMovedEvent, _>("recruit", move |context, event| {
        push(&outer_log, "recruit");
        let inner_log = Arc::clone(&outer_log);
        let actor = context
            .board_mut()
            .actor_instance_mut(event.actor_instance_id)
            .context("moved actor is placed")?;
        let collection = actor
            .event_handlers_mut()
            .ok_or_else(|| anyhow!("moved actor has handlers"))?;
        let _ = collection.register::<ActorInstanceMovedEvent, _>("recruit", move |_, _| {
            push(&inner_log, "recruited");
            Ok(EventResult::Unhandled)
        });
        Ok(EventResult::Completed)
    });
    let _ = world
        .add_actor_instance(actor(LEADER, 0, 0).with_event_handlers(handlers))
        .expect("free cell");

    let _ = world
        .try_move_actor_instance(LEADER, Coordinate::new(1, 0))
        .expect("valid request");
    assert_eq!(*log.lock().expect("log lock"), vec!["recruit"]);

    let _ = world
        .try_move_actor_instance(LEADER, Coordinate::new(2, 0))
        .expect("valid request");
    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["recruit", "recruit", "recruited"]
    );
}

#[test]
fn handler_removing_itself_still_lets_the_rest_run() {
    let log = Log::default();
    let mut world = field();
    let mut handlers = EventHandlerCollection::new();
    let once_log = Arc::clone(&log);
    let once = Arc::new(Mutex::new(None::<HandlerId>));
    let own_id = Arc::clone(&once);
    let id = handlers.register::<ActorInstanceMovedEvent, _>("once", move |context, event| {
        push(&once_log, "once");
        let recorded = *own_id.lock().expect("id lock");
        let id = recorded.context("id recorded")?;
        let removed = context
            .board_mut()
            .actor_instance_mut(event.actor_instance_id)
            .and_then(ActorInstance::event_handlers_mut)
            .is_some_and(|collection| collection.remove(id));
        Ok(if removed {
            EventResult::Completed
        } else {
            EventResult::Canceled
        })
    });
    *once.lock().expect("id lock") = Some(id);
    let always_log = Arc::clone(&log);
    let _ = handlers.register::<ActorInstanceMovedEvent, _>("always", move |_, _| {
        push(&always_log, "always");
        Ok(EventResult::Unhandled)
    });
    let _ = world
        .add_actor_instance(actor(LEADER, 0, 0).with_event_handlers(handlers))
        .expect("free cell");

    for x in 1..=2 {
        let outcome = world
            .try_move_actor_instance(LEADER, Coordinate::new(x, 0))
            .expect("valid request");
        assert!(outcome.succeeded());
    }

    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["once", "always", "always"]
    );
}

#[test]
fn created_handler_can_remove_the_new_actor() {
    let mut world = field();
    let mut handlers = EventHandlerCollection::new();
    let _ = handlers.register::<ActorInstanceCreatedEvent, _>("vanish", |context, event| {
        let _ = context.remove_actor_instance(event.actor_instance_id)?;
        Ok(EventResult::Completed)
    });

    let result = world
        .add_actor_instance(actor(LEADER, 2, 0).with_event_handlers(handlers))
        .expect("free cell");

    assert_eq!(result, EventResult::Completed);
    assert!(query::actor_instance(&world, LEADER).is_none());
}
