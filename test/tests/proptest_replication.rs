use proptest::prelude::*;

use mirra_shared::{EntityRef, WorldMutExt, WorldMutType, WorldRefExt};
use mirra_test::{Health, Inventory, Position, Session};

#[derive(Clone, Debug)]
enum Op {
    Spawn(i32, i32),
    Despawn(usize),
    Move(usize, i32, i32),
    SetHealth(usize, u32),
    DropHealth(usize),
    PushItem(usize, u16),
    ClearItems(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<i32>(), any::<i32>()).prop_map(|(x, y)| Op::Spawn(x, y)),
        any::<usize>().prop_map(Op::Despawn),
        (any::<usize>(), -300i32..300, -300i32..300).prop_map(|(i, x, y)| Op::Move(i, x, y)),
        (any::<usize>(), any::<u32>()).prop_map(|(i, h)| Op::SetHealth(i, h)),
        any::<usize>().prop_map(Op::DropHealth),
        (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Op::PushItem(i, v)),
        any::<usize>().prop_map(Op::ClearItems),
    ]
}

fn pick(live: &[EntityRef], index: usize) -> Option<EntityRef> {
    if live.is_empty() {
        None
    } else {
        Some(live[index % live.len()])
    }
}

fn apply(session: &mut Session, live: &mut Vec<EntityRef>, op: &Op) {
    let world = &mut session.world;
    match *op {
        Op::Spawn(x, y) => {
            let entity = world.spawn_entity();
            world.insert_component(&entity, Position::new(x, y));
            session.server.replicate(entity);
            live.push(entity);
        }
        Op::Despawn(index) => {
            if let Some(entity) = pick(live, index) {
                world.despawn_entity(&entity);
                live.retain(|other| *other != entity);
            }
        }
        Op::Move(index, dx, dy) => {
            if let Some(entity) = pick(live, index) {
                let position = world.component_mut::<Position>(&entity).unwrap();
                position.x = position.x.wrapping_add(dx);
                position.y = position.y.wrapping_add(dy);
            }
        }
        Op::SetHealth(index, health) => {
            if let Some(entity) = pick(live, index) {
                world.insert_component(&entity, Health(health));
            }
        }
        Op::DropHealth(index) => {
            if let Some(entity) = pick(live, index) {
                world.remove_component::<Health>(&entity);
            }
        }
        Op::PushItem(index, item) => {
            if let Some(entity) = pick(live, index) {
                if world.has_component::<Inventory>(&entity) {
                    world.component_mut::<Inventory>(&entity).unwrap().0.push(item);
                } else {
                    world.insert_component(&entity, Inventory(vec![item]));
                }
            }
        }
        Op::ClearItems(index) => {
            if let Some(entity) = pick(live, index) {
                world.remove_component::<Inventory>(&entity);
            }
        }
    }
}

fn assert_mirrored(session: &Session, live: &[EntityRef]) {
    for id in [1, 2] {
        let client_world = &session.client(id).world;
        assert_eq!(client_world.len(), live.len());

        for entity in live {
            let mirror = session.mirror_of(id, entity).expect("live entity is mirrored");
            assert_eq!(
                client_world.component::<Position>(&mirror),
                session.world.component::<Position>(entity)
            );
            assert_eq!(
                client_world.component::<Health>(&mirror),
                session.world.component::<Health>(entity)
            );
            assert_eq!(
                client_world.component::<Inventory>(&mirror),
                session.world.component::<Inventory>(entity)
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mirrors_follow_the_server(
        batches in prop::collection::vec(prop::collection::vec(op(), 0..6), 1..8),
        late_tick in 0usize..8,
    ) {
        let mut session = Session::default();
        session.connect(1);
        let mut live = Vec::new();

        for (tick, batch) in batches.iter().enumerate() {
            if tick == late_tick {
                session.connect(2);
            }
            for op in batch {
                apply(&mut session, &mut live, op);
            }
            session.server_tick();
        }

        if late_tick >= batches.len() {
            session.connect(2);
            session.server_tick();
        }
        assert_mirrored(&session, &live);
    }
}
