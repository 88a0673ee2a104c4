use std::marker::PhantomData;

use mirra_serde::{read_count, write_count, BitReader, BitWrite, SerdeErr};

use crate::{
    system::{
        replicated::{ReplicatedBuffer, ReplicatedComponent},
        snapshot::Snapshot,
    },
    world::{
        component_kind::ComponentKind,
        entity_ref::EntityRef,
        world_type::{WorldMutExt, WorldMutType, WorldRefExt, WorldRefType},
    },
};

/// Bridges one component type to the value a [`DeltaSerializer`] moves.
///
/// [`DeltaSerializer`]: crate::DeltaSerializer
pub trait SnapshotAdapter: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    fn component_kind() -> ComponentKind;

    fn capture(world: &dyn WorldRefType, entity: &EntityRef) -> Option<Self::Value>;

    fn write_full(value: &Self::Value, writer: &mut dyn BitWrite);

    fn read_full(reader: &mut BitReader) -> Result<Self::Value, SerdeErr>;

    fn write_delta(value: &Self::Value, baseline: &Self::Value, writer: &mut dyn BitWrite);

    fn read_delta(baseline: &Self::Value, reader: &mut BitReader) -> Result<Self::Value, SerdeErr>;

    fn apply(world: &mut dyn WorldMutType, entity: &EntityRef, value: &Self::Value);
}

/// One snapshot value per entity, written onto a singular component.
pub struct ComponentAdapter<C: ReplicatedComponent>(PhantomData<fn() -> C>);

impl<C: ReplicatedComponent> SnapshotAdapter for ComponentAdapter<C> {
    type Value = C::Snapshot;

    fn component_kind() -> ComponentKind {
        ComponentKind::of::<C>()
    }

    fn capture(world: &dyn WorldRefType, entity: &EntityRef) -> Option<Self::Value> {
        world.component::<C>(entity).map(|component| component.to_snapshot())
    }

    fn write_full(value: &Self::Value, writer: &mut dyn BitWrite) {
        value.write_full(writer);
    }

    fn read_full(reader: &mut BitReader) -> Result<Self::Value, SerdeErr> {
        <C::Snapshot as Snapshot>::read_full(reader)
    }

    fn write_delta(value: &Self::Value, baseline: &Self::Value, writer: &mut dyn BitWrite) {
        value.write_delta(baseline, writer);
    }

    fn read_delta(baseline: &Self::Value, reader: &mut BitReader) -> Result<Self::Value, SerdeErr> {
        <C::Snapshot as Snapshot>::read_delta(baseline, reader)
    }

    fn apply(world: &mut dyn WorldMutType, entity: &EntityRef, value: &Self::Value) {
        if let Some(component) = world.component_mut::<C>(entity) {
            component.apply_snapshot(value);
        } else {
            world.insert_component(entity, C::from_snapshot(value));
        }
    }
}

/// A variable-length list per entity, written into a resizable component.
///
/// Deltas first carry the new length, then one element delta per index the
/// baseline also holds and a full element for every index past its end.
pub struct BufferAdapter<B: ReplicatedBuffer>(PhantomData<fn() -> B>);

impl<B: ReplicatedBuffer> SnapshotAdapter for BufferAdapter<B> {
    type Value = Vec<B::Element>;

    fn component_kind() -> ComponentKind {
        ComponentKind::of::<B>()
    }

    fn capture(world: &dyn WorldRefType, entity: &EntityRef) -> Option<Self::Value> {
        world
            .component::<B>(entity)
            .map(|buffer| buffer.elements().to_vec())
    }

    fn write_full(value: &Self::Value, writer: &mut dyn BitWrite) {
        write_count(writer, value.len());
        for element in value {
            element.write_full(writer);
        }
    }

    fn read_full(reader: &mut BitReader) -> Result<Self::Value, SerdeErr> {
        let length = read_count(reader)?;
        let mut output = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            output.push(<B::Element as Snapshot>::read_full(reader)?);
        }
        Ok(output)
    }

    fn write_delta(value: &Self::Value, baseline: &Self::Value, writer: &mut dyn BitWrite) {
        write_count(writer, value.len());
        for (index, element) in value.iter().enumerate() {
            match baseline.get(index) {
                Some(previous) => element.write_delta(previous, writer),
                None => element.write_full(writer),
            }
        }
    }

    fn read_delta(baseline: &Self::Value, reader: &mut BitReader) -> Result<Self::Value, SerdeErr> {
        let length = read_count(reader)?;
        let mut output = Vec::with_capacity(length.min(1024));
        for index in 0..length {
            let element = match baseline.get(index) {
                Some(previous) => <B::Element as Snapshot>::read_delta(previous, reader)?,
                None => <B::Element as Snapshot>::read_full(reader)?,
            };
            output.push(element);
        }
        Ok(output)
    }

    fn apply(world: &mut dyn WorldMutType, entity: &EntityRef, value: &Self::Value) {
        if let Some(buffer) = world.component_mut::<B>(entity) {
            *buffer.elements_mut() = value.clone();
        } else {
            world.insert_component(entity, B::from_elements(value.clone()));
        }
    }
}
