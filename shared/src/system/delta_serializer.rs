use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
    error::ReplicationError,
    system::{
        adapter::{BufferAdapter, ComponentAdapter, SnapshotAdapter},
        baseline_column::BaselineColumn,
        block::{decode_block, encode_block, DecodedBlock},
        merge_group::MergeGroupCollection,
        serializer_system::{ArchetypeUpdate, DeserializeTarget, SerializerSystem},
    },
    types::{InstigatorId, SystemId, Tick},
    work_group::WorkGroup,
    world::{
        component_kind::LocalArchetype,
        entity_ref::EntityRef,
        world_commands::WorldCommands,
        world_type::{WorldMutType, WorldRefType},
    },
};

pub type ComponentSerializer<C> = DeltaSerializer<ComponentAdapter<C>>;
pub type BufferSerializer<B> = DeltaSerializer<BufferAdapter<B>>;

struct SerializeSlot<V> {
    column: BaselineColumn<V>,
    output: Vec<u8>,
}

struct DeserializeSlot<V> {
    source: InstigatorId,
    column: BaselineColumn<V>,
    decoded: Option<DecodedBlock<V>>,
}

/// A [`SerializerSystem`] that delta-codes one value per entity.
///
/// Each merge group is encoded once, against the baseline column of its
/// first member; when the group is finalized that column is copied to every
/// other member, so the columns of a group stay identical.
pub struct DeltaSerializer<A: SnapshotAdapter> {
    id: SystemId,
    name: String,
    delegable: bool,
    upload: bool,
    send_columns: HashMap<InstigatorId, BaselineColumn<A::Value>>,
    recv_columns: HashMap<InstigatorId, BaselineColumn<A::Value>>,
    serialize_slots: Vec<(Vec<InstigatorId>, Arc<Mutex<SerializeSlot<A::Value>>>)>,
    deserialize_slots: Vec<Arc<Mutex<DeserializeSlot<A::Value>>>>,
    phantom: PhantomData<fn() -> A>,
}

impl<A: SnapshotAdapter> DeltaSerializer<A> {
    pub fn new(id: SystemId) -> Self {
        let full_name = A::component_kind().name();
        let name = full_name.rsplit("::").next().unwrap_or(full_name).to_string();
        Self {
            id,
            name,
            delegable: true,
            upload: true,
            send_columns: HashMap::new(),
            recv_columns: HashMap::new(),
            serialize_slots: Vec::new(),
            deserialize_slots: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Authority over this system is never handed to another peer.
    pub fn without_delegation(mut self) -> Self {
        self.delegable = false;
        self
    }

    /// The system never sends data upstream.
    pub fn without_upload(mut self) -> Self {
        self.upload = false;
        self
    }

    pub fn sent_baseline(&self, instigator: InstigatorId, entity: &EntityRef) -> Option<&A::Value> {
        self.send_columns.get(&instigator)?.get(entity)
    }

    pub fn received_baseline(&self, source: InstigatorId, remote: &EntityRef) -> Option<&A::Value> {
        self.recv_columns.get(&source)?.get(remote)
    }
}

impl<A: SnapshotAdapter> SerializerSystem for DeltaSerializer<A> {
    fn id(&self) -> SystemId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_archetype_valid(&self, archetype: &LocalArchetype) -> bool {
        archetype.contains(&A::component_kind())
    }

    fn is_authority_valid(&self, archetype: &LocalArchetype) -> bool {
        self.delegable && self.is_archetype_valid(archetype)
    }

    fn is_upload_enabled(&self) -> bool {
        self.upload
    }

    fn has_initial_data(&self, instigator: InstigatorId) -> bool {
        self.send_columns.contains_key(&instigator)
    }

    fn prepare_serialize(
        &mut self,
        _tick: Tick,
        world: &dyn WorldRefType,
        groups: &MergeGroupCollection,
        entities: &[EntityRef],
        work: &mut WorkGroup,
    ) -> Result<(), ReplicationError> {
        self.serialize_slots.clear();

        let mut values = Vec::with_capacity(entities.len());
        for entity in entities {
            let value = A::capture(world, entity).ok_or(ReplicationError::ComponentMissing {
                system_id: self.id,
                entity: *entity,
                component: A::component_kind().name(),
            })?;
            values.push(value);
        }
        let entities = Arc::new(entities.to_vec());
        let values = Arc::new(values);

        for members in groups.groups() {
            let Some(leader) = members.first() else {
                continue;
            };
            let column = self.send_columns.remove(leader).unwrap_or_default();
            let slot = Arc::new(Mutex::new(SerializeSlot {
                column,
                output: Vec::new(),
            }));
            self.serialize_slots.push((members.clone(), slot.clone()));

            let entities = entities.clone();
            let values = values.clone();
            work.push(move || {
                let mut guard = slot.lock();
                let SerializeSlot { column, output } = &mut *guard;
                *output = encode_block::<A>(&entities, &values, column);
                Ok(())
            });
        }

        Ok(())
    }

    fn finalize_serialize(&mut self, group: usize) -> Result<Vec<u8>, ReplicationError> {
        let Some((members, slot)) = self.serialize_slots.get(group) else {
            return Err(ReplicationError::GroupNotPrepared {
                system_id: self.id,
                group,
            });
        };

        let mut guard = slot.lock();
        let column = std::mem::take(&mut guard.column);
        let output = std::mem::take(&mut guard.output);

        if let Some((leader, rest)) = members.split_first() {
            for member in rest {
                self.send_columns.insert(*member, column.clone());
            }
            self.send_columns.insert(*leader, column);
        }

        Ok(output)
    }

    fn invalidate_sent(&mut self, entity: &EntityRef) {
        for column in self.send_columns.values_mut() {
            column.invalidate(entity);
        }
    }

    fn invalidate_received(&mut self, source: InstigatorId, remote: &EntityRef) {
        if let Some(column) = self.recv_columns.get_mut(&source) {
            column.invalidate(remote);
        }
    }

    fn prepare_deserialize(
        &mut self,
        _tick: Tick,
        bytes: Vec<u8>,
        target: DeserializeTarget,
        work: &mut WorkGroup,
    ) {
        let column = self.recv_columns.remove(&target.source).unwrap_or_default();
        let slot = Arc::new(Mutex::new(DeserializeSlot {
            source: target.source,
            column,
            decoded: None,
        }));
        self.deserialize_slots.push(slot.clone());

        let system_id = self.id;
        work.push(move || {
            let mut guard = slot.lock();
            let decoded = decode_block::<A>(system_id, &bytes, &target, &guard.column)?;
            guard.decoded = Some(decoded);
            Ok(())
        });
    }

    fn finalize_deserialize(&mut self, world: &mut dyn WorldMutType) {
        for slot in std::mem::take(&mut self.deserialize_slots) {
            let mut guard = slot.lock();
            let mut column = std::mem::take(&mut guard.column);
            if let Some(mut decoded) = guard.decoded.take() {
                decoded.advance(&mut column);
                for (entity, value) in decoded.values {
                    if world.has_entity(&entity) {
                        A::apply(world, &entity, &value);
                    }
                }
            }
            self.recv_columns.insert(guard.source, column);
        }
    }

    fn abort_deserialize(&mut self) {
        for slot in std::mem::take(&mut self.deserialize_slots) {
            let mut guard = slot.lock();
            let column = std::mem::take(&mut guard.column);
            self.recv_columns.insert(guard.source, column);
        }
    }

    fn on_archetype_update(
        &mut self,
        _source: InstigatorId,
        updates: &[ArchetypeUpdate],
        commands: &mut WorldCommands,
    ) {
        for update in updates {
            if !update.contains {
                commands.remove_component_of_kind(update.self_entity, A::component_kind());
            }
        }
    }

    fn on_reset(&mut self, instigator: InstigatorId) {
        self.send_columns.remove(&instigator);
    }

    fn on_remake(&mut self, source: InstigatorId) {
        self.recv_columns.remove(&source);
    }
}
