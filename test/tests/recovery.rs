use mirra_server::MirraServerError;
use mirra_shared::{
    encode_block, write_count, ArchetypeEntry, ArchetypeId, BaselineColumn, BitWrite, BitWriter,
    ComponentAdapter, EntityEntry, EntityRef, SnapshotMessage, SystemBlock, WorldMutExt,
    WorldMutType, WorldRefExt, WorldRefType,
};
use mirra_test::{
    test_protocol::{protocol_without_inventory, HEALTH, INVENTORY, POSITION},
    Health, Inventory, Position, Session,
};

fn spawn_unit(session: &mut Session) -> EntityRef {
    let entity = session.world.spawn_entity();
    session.world.insert_component(&entity, Position::new(8, 8));
    session.world.insert_component(&entity, Health(80));
    session.server.replicate(entity);
    entity
}

/// A block claiming two entities where the receiver knows one.
fn miscounted_block() -> Vec<u8> {
    let mut body = BitWriter::new();
    write_count(&mut body, 2);
    let body_bits = body.bits_written();

    let mut writer = BitWriter::new();
    write_count(&mut writer, body_bits as usize);
    writer.write_bytes(&body.to_bytes());
    writer.to_bytes()
}

#[test]
fn corrupt_block_drops_the_tick() {
    let mut session = Session::default();
    session.connect(1);
    let entity = spawn_unit(&mut session);

    session.server_send();
    let payloads = session.hub.drain(1);
    let mut message = SnapshotMessage::read(&payloads[0].1).unwrap();
    for block in message.blocks.iter_mut() {
        if block.system_id == POSITION {
            block.bytes = miscounted_block();
        }
    }
    session.hub.deliver(0, 1, message.write());

    let results = session.client_receive(1);
    let error = results[0].as_ref().unwrap_err();
    assert!(error.is_framing());

    // The entity is known, but no value of the tick was applied.
    let mirror = session.mirror_of(1, &entity).unwrap();
    let world = &session.client(1).world;
    assert!(world.has_entity(&mirror));
    assert!(!world.has_component::<Position>(&mirror));
    assert!(!world.has_component::<Health>(&mirror));

    // Deltas against values the client never applied cannot be read.
    session.server_send();
    let results = session.client_receive(1);
    assert!(results[0].as_ref().unwrap_err().is_framing());

    session.server.reset_client(1).unwrap();
    let reports = session.server_tick();
    assert!(reports[0].full_remake);
    assert!(reports[0].spawned.is_empty());

    let world = &session.client(1).world;
    assert_eq!(world.component::<Position>(&mirror), Some(&Position::new(8, 8)));
    assert_eq!(world.component::<Health>(&mirror), Some(&Health(80)));
}

#[test]
fn removals_apply_when_a_block_is_corrupt() {
    let mut session = Session::default();
    session.connect(1);
    let kept = spawn_unit(&mut session);
    let dropped = spawn_unit(&mut session);
    session.server_tick();
    let kept_mirror = session.mirror_of(1, &kept).unwrap();
    let dropped_mirror = session.mirror_of(1, &dropped).unwrap();

    session.server.unreplicate(&dropped);
    session.server_send();
    let payloads = session.hub.drain(1);
    let mut message = SnapshotMessage::read(&payloads[0].1).unwrap();
    assert_eq!(message.removed.len(), 1);
    for block in message.blocks.iter_mut() {
        if block.system_id == POSITION {
            block.bytes = miscounted_block();
        }
    }
    session.hub.deliver(0, 1, message.write());

    let results = session.client_receive(1);
    let error = results[0].as_ref().unwrap_err();
    assert!(error.is_framing());
    let applied = error.applied.as_ref().unwrap();
    assert_eq!(applied.despawned, vec![dropped_mirror]);
    assert!(!session.client(1).world.has_entity(&dropped_mirror));

    session.server.reset_client(1).unwrap();
    let reports = session.server_tick();
    assert!(reports[0].despawned.is_empty());
    assert!(reports[0].spawned.is_empty());

    let world = &session.client(1).world;
    assert_eq!(world.len(), 1);
    assert_eq!(world.component::<Health>(&kept_mirror), Some(&Health(80)));
}

#[test]
fn far_remote_ids_are_accepted() {
    let mut session = Session::default();
    session.connect(1);
    let remote = EntityRef::new(u32::MAX - 1, 1);
    let archetype = ArchetypeId::new(1);

    let mut sent = BaselineColumn::new();
    let mut message = SnapshotMessage::new(3, false);
    message.archetypes.push(ArchetypeEntry {
        id: archetype,
        systems: vec![HEALTH],
    });
    message.entities.push(EntityEntry {
        entity: remote,
        origin: remote,
        archetype,
        origin_instigator: 0,
    });
    message.blocks.push(SystemBlock {
        system_id: HEALTH,
        bytes: encode_block::<ComponentAdapter<Health>>(&[remote], &[12], &mut sent),
    });
    session.hub.deliver(0, 1, message.write());

    let results = session.client_receive(1);
    let report = results[0].as_ref().unwrap();
    assert_eq!(report.spawned.len(), 1);
    assert_eq!(
        session.client(1).world.component::<Health>(&report.spawned[0]),
        Some(&Health(12))
    );
    assert_eq!(session.client(1).client.local_entity(&remote), Some(report.spawned[0]));
}

#[test]
fn truncated_message_is_rejected() {
    let mut session = Session::default();
    session.connect(1);
    spawn_unit(&mut session);

    session.server_send();
    let mut payload = session.hub.drain(1).remove(0).1;
    payload.truncate(2);
    session.hub.deliver(0, 1, payload);

    let results = session.client_receive(1);
    assert!(results[0].as_ref().unwrap_err().is_framing());
    assert!(session.client(1).world.is_empty());
}

#[test]
fn unknown_system_is_skipped() {
    let mut session = Session::default();
    session.connect(1);
    session.connect_with(2, protocol_without_inventory());

    let entity = spawn_unit(&mut session);
    session.world.insert_component(&entity, Inventory(vec![4, 8, 15]));

    let reports = session.server_tick();
    assert!(reports[0].skipped_systems.is_empty());
    assert_eq!(reports[1].skipped_systems, vec![INVENTORY]);
    assert!(reports[1].applied_systems.contains(&HEALTH));

    let full = session.mirror_of(1, &entity).unwrap();
    assert_eq!(
        session.client(1).world.component::<Inventory>(&full),
        Some(&Inventory(vec![4, 8, 15]))
    );

    let partial = session.mirror_of(2, &entity).unwrap();
    let world = &session.client(2).world;
    assert!(!world.has_component::<Inventory>(&partial));
    assert_eq!(world.component::<Position>(&partial), Some(&Position::new(8, 8)));

    session.world.component_mut::<Inventory>(&entity).unwrap().0.push(16);
    let reports = session.server_tick();
    assert_eq!(reports[1].skipped_systems, vec![INVENTORY]);
    assert_eq!(
        session.client(1).world.component::<Inventory>(&full),
        Some(&Inventory(vec![4, 8, 15, 16]))
    );
}

#[test]
fn client_reset_restarts_uploads() {
    let mut session = Session::default();
    session.connect(1);
    let created = {
        let test_client = session.client_mut(1);
        let entity = test_client.world.spawn_entity();
        test_client.world.insert_component(&entity, Position::new(1, 2));
        test_client.client.replicate(entity);
        entity
    };
    let reports = session.client_tick(1);
    assert!(reports[0].full_remake);
    let on_server = reports[0].spawned[0];

    let reports = session.client_tick(1);
    assert!(!reports[0].full_remake);

    session.client_mut(1).client.reset().unwrap();
    *session
        .client_mut(1)
        .world
        .component_mut::<Position>(&created)
        .unwrap() = Position::new(3, 4);
    let reports = session.client_tick(1);

    assert!(reports[0].full_remake);
    assert!(reports[0].spawned.is_empty());
    assert!(reports[0].despawned.is_empty());
    assert_eq!(
        session.world.component::<Position>(&on_server),
        Some(&Position::new(3, 4))
    );
}

#[test]
fn full_remake_removes_what_it_omits() {
    let mut session = Session::default();
    session.connect(1);
    let kept = spawn_unit(&mut session);
    let dropped = spawn_unit(&mut session);
    session.server_tick();
    let dropped_mirror = session.mirror_of(1, &dropped).unwrap();

    // Lost message: the client never hears about the removal.
    session.server.unreplicate(&dropped);
    session.server_send();
    session.hub.drain(1);

    session.server.reset_client(1).unwrap();
    let reports = session.server_tick();

    assert!(reports[0].full_remake);
    assert_eq!(reports[0].despawned, vec![dropped_mirror]);
    assert!(session.mirror_of(1, &kept).is_some());
}

#[test]
fn client_ids_are_checked() {
    let mut session = Session::default();
    assert!(matches!(
        session.server.connect_client(0),
        Err(MirraServerError::ReservedClientId(0))
    ));
    assert!(matches!(
        session.server.reset_client(4),
        Err(MirraServerError::UnknownClient(4))
    ));

    session.connect(4);
    assert_eq!(session.server.client_ids(), vec![4]);
    assert!(session.server.reset_client(4).is_ok());
}
