use mirra_server::MirraServerError;
use mirra_shared::{
    ArchetypeEntry, ArchetypeId, EntityEntry, EntityRef, OwnershipError, OwnershipPermissions,
    OwnershipRecord, SnapshotMessage, WorldMutExt, WorldMutType, WorldRefExt, WorldRefType,
};
use mirra_test::{
    test_protocol::{HEALTH, POSITION, SCORE, TEAM},
    Health, Position, Score, Session, Team,
};

/// A server entity with delegable and server-only systems, already replicated
/// to clients 1 and 2.
fn leased_setup() -> (Session, EntityRef) {
    let mut session = Session::default();
    session.connect(1);
    session.connect(2);

    let entity = session.world.spawn_entity();
    session.world.insert_component(&entity, Position::new(0, 0));
    session.world.insert_component(&entity, Health(5));
    session.world.insert_component(&entity, Score(1));
    session.world.insert_component(&entity, Team(2));
    session.server.replicate(entity);
    session.server_tick();

    (session, entity)
}

#[test]
fn grant_covers_delegable_systems() {
    let (mut session, entity) = leased_setup();

    session.server.grant_ownership(entity, 1).unwrap();
    assert_eq!(session.server.owner_of(&entity), Some(1));

    let reports = session.server_tick();
    let mirror = session.mirror_of(1, &entity).unwrap();
    assert_eq!(reports[0].granted, vec![mirror]);
    assert!(reports[1].granted.is_empty());

    let client = &session.client(1).client;
    assert!(client.has_authority(&mirror, POSITION));
    assert!(client.has_authority(&mirror, HEALTH));
    assert!(!client.has_authority(&mirror, SCORE));
    assert!(!client.has_authority(&mirror, TEAM));
    assert_eq!(client.owned_entities(), vec![mirror]);
}

#[test]
fn owner_writes_reach_server_and_other_clients() {
    let (mut session, entity) = leased_setup();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();
    let mirror = session.mirror_of(1, &entity).unwrap();

    {
        let world = &mut session.client_mut(1).world;
        *world.component_mut::<Position>(&mirror).unwrap() = Position::new(9, 9);
        *world.component_mut::<Score>(&mirror).unwrap() = Score(99);
    }
    let reports = session.client_tick(1);
    assert_eq!(reports[0].adopted, vec![entity]);

    assert_eq!(
        session.world.component::<Position>(&entity),
        Some(&Position::new(9, 9))
    );
    // Outside the writable archetype.
    assert_eq!(session.world.component::<Score>(&entity), Some(&Score(1)));

    session.server_tick();
    let elsewhere = session.mirror_of(2, &entity).unwrap();
    assert_eq!(
        session.client(2).world.component::<Position>(&elsewhere),
        Some(&Position::new(9, 9))
    );

    let owner_world = &session.client(1).world;
    assert_eq!(owner_world.component::<Position>(&mirror), Some(&Position::new(9, 9)));
    assert_eq!(owner_world.component::<Score>(&mirror), Some(&Score(1)));
}

#[test]
fn server_writes_to_leased_systems_are_ignored_by_owner() {
    let (mut session, entity) = leased_setup();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();
    let mirror = session.mirror_of(1, &entity).unwrap();

    *session.world.component_mut::<Health>(&entity).unwrap() = Health(50);
    session.server_tick();

    assert_eq!(
        session.client(1).world.component::<Health>(&mirror),
        Some(&Health(5))
    );
    let elsewhere = session.mirror_of(2, &entity).unwrap();
    assert_eq!(
        session.client(2).world.component::<Health>(&elsewhere),
        Some(&Health(50))
    );
}

#[test]
fn revoke_returns_authority_without_destroying() {
    let (mut session, entity) = leased_setup();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();
    session.client_tick(1);
    let mirror = session.mirror_of(1, &entity).unwrap();

    assert_eq!(session.server.revoke_ownership(&entity), Some(1));
    assert_eq!(session.server.owner_of(&entity), None);
    assert_eq!(session.server.revoke_ownership(&entity), None);

    let reports = session.server_tick();
    assert_eq!(reports[0].revoked, vec![mirror]);
    assert!(!session.client(1).client.has_authority(&mirror, POSITION));

    let reports = session.client_tick(1);
    assert!(reports[0].despawned.is_empty());
    assert!(session.world.has_entity(&entity));
    assert!(session.client(1).world.has_entity(&mirror));
}

#[test]
fn last_grant_wins() {
    let (mut session, entity) = leased_setup();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();

    session.server.grant_ownership(entity, 2).unwrap();
    assert_eq!(session.server.owner_of(&entity), Some(2));

    let reports = session.server_tick();
    let first = session.mirror_of(1, &entity).unwrap();
    let second = session.mirror_of(2, &entity).unwrap();
    assert_eq!(reports[0].revoked, vec![first]);
    assert_eq!(reports[1].granted, vec![second]);

    assert!(!session.client(1).client.has_authority(&first, POSITION));
    assert!(session.client(2).client.has_authority(&second, POSITION));
}

#[test]
fn owner_may_destroy_with_permission() {
    let (mut session, entity) = leased_setup();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();
    session.client_tick(1);
    let mirror = session.mirror_of(1, &entity).unwrap();

    session.client_mut(1).world.despawn_entity(&mirror);
    let reports = session.client_tick(1);

    assert_eq!(reports[0].despawned, vec![entity]);
    assert!(!session.world.has_entity(&entity));
    assert_eq!(session.server.owner_of(&entity), None);
}

#[test]
fn owner_without_destroy_permission_only_releases() {
    let (mut session, entity) = leased_setup();
    session
        .server
        .set_client_permissions(1, OwnershipPermissions::CREATE_ENTITY)
        .unwrap();
    session.server.grant_ownership(entity, 1).unwrap();
    session.server_tick();
    session.client_tick(1);
    let mirror = session.mirror_of(1, &entity).unwrap();

    session.client_mut(1).world.despawn_entity(&mirror);
    let reports = session.client_tick(1);

    assert!(reports[0].despawned.is_empty());
    assert!(session.world.has_entity(&entity));
    assert_eq!(session.server.owner_of(&entity), None);
}

#[test]
fn grants_are_checked() {
    let (mut session, entity) = leased_setup();

    assert!(matches!(
        session.server.grant_ownership(entity, 7),
        Err(MirraServerError::Ownership(OwnershipError::UnknownClient { peer: 7 }))
    ));

    let fresh = session.world.spawn_entity();
    session.world.insert_component(&fresh, Position::new(0, 0));
    session.server.replicate(fresh);
    assert!(matches!(
        session.server.grant_ownership(fresh, 1),
        Err(MirraServerError::Ownership(OwnershipError::EntityNotRegistered { .. }))
    ));

    let server_only = session.world.spawn_entity();
    session.world.insert_component(&server_only, Team(1));
    session.server.replicate(server_only);
    session.server_tick();
    assert!(matches!(
        session.server.grant_ownership(server_only, 1),
        Err(MirraServerError::Ownership(OwnershipError::NoDelegableSystems { .. }))
    ));
}

#[test]
fn grant_ahead_of_its_entity_waits() {
    let mut session = Session::default();
    session.connect(1);
    let remote = EntityRef::new(40, 1);
    let writable = ArchetypeId::new(1);

    let mut grant = SnapshotMessage::new(10, false);
    grant.archetypes.push(ArchetypeEntry {
        id: writable,
        systems: vec![POSITION],
    });
    grant.ownership.push(OwnershipRecord::grant(
        remote,
        writable,
        OwnershipPermissions::all(),
    ));
    session.hub.deliver(0, 1, grant.write());

    let reports = session.client_receive(1);
    assert!(reports[0].as_ref().unwrap().granted.is_empty());
    let upstream = session.client(1).client.instigator().client(0).unwrap();
    assert_eq!(upstream.pending_ownership().len(), 1);

    let mut spawn = SnapshotMessage::new(11, false);
    spawn.entities.push(EntityEntry {
        entity: remote,
        origin: remote,
        archetype: writable,
        origin_instigator: 0,
    });
    session.hub.deliver(0, 1, spawn.write());

    let reports = session.client_receive(1);
    let report = reports[0].as_ref().unwrap();
    assert_eq!(report.spawned.len(), 1);
    assert_eq!(report.granted, report.spawned);
    assert!(session
        .client(1)
        .client
        .has_authority(&report.spawned[0], POSITION));
}

#[test]
fn pending_grant_expires() {
    let mut session = Session::default();
    session.connect(1);
    let remote = EntityRef::new(50, 1);
    let writable = ArchetypeId::new(1);
    let ttl = session.client(1).client.config().pending_ownership_ttl;

    let mut grant = SnapshotMessage::new(10, false);
    grant.archetypes.push(ArchetypeEntry {
        id: writable,
        systems: vec![POSITION],
    });
    grant.ownership.push(OwnershipRecord::grant(
        remote,
        writable,
        OwnershipPermissions::all(),
    ));
    session.hub.deliver(0, 1, grant.write());
    session.hub.deliver(0, 1, SnapshotMessage::new(10 + ttl + 1, false).write());

    let mut spawn = SnapshotMessage::new(10 + ttl + 2, false);
    spawn.entities.push(EntityEntry {
        entity: remote,
        origin: remote,
        archetype: writable,
        origin_instigator: 0,
    });
    session.hub.deliver(0, 1, spawn.write());

    let reports = session.client_receive(1);
    assert_eq!(reports.len(), 3);
    let report = reports[2].as_ref().unwrap();
    assert_eq!(report.spawned.len(), 1);
    assert!(report.granted.is_empty());

    let upstream = session.client(1).client.instigator().client(0).unwrap();
    assert!(upstream.pending_ownership().is_empty());
}
