use mirra_serde::{
    read_count, write_count, BitReader, BitWrite, BitWriter, Serde, SerdeErr, SignedDelta,
    UnsignedDelta,
};

use crate::{
    archetype::archetype_table::ArchetypeId,
    ownership::permissions::{OwnershipPermissions, OwnershipRecord},
    types::{InstigatorId, SystemId, Tick},
    world::entity_ref::EntityRef,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchetypeEntry {
    pub id: ArchetypeId,
    /// Ascending.
    pub systems: Vec<SystemId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityEntry {
    /// The producer's local ref.
    pub entity: EntityRef,
    pub origin: EntityRef,
    pub archetype: ArchetypeId,
    pub origin_instigator: InstigatorId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemBlock {
    pub system_id: SystemId,
    pub bytes: Vec<u8>,
}

/// One producer-to-peer message.
///
/// The header tables are bit-packed, each field delta-coded against the same
/// field of the previous entry. The system blocks that follow start on a byte
/// boundary and run to the end of the message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotMessage {
    pub tick: Tick,
    pub full_remake: bool,
    pub archetypes: Vec<ArchetypeEntry>,
    pub entities: Vec<EntityEntry>,
    /// Always empty in a full remake.
    pub removed: Vec<EntityRef>,
    pub ownership: Vec<OwnershipRecord>,
    pub blocks: Vec<SystemBlock>,
}

impl SnapshotMessage {
    pub fn new(tick: Tick, full_remake: bool) -> Self {
        Self {
            tick,
            full_remake,
            ..Default::default()
        }
    }

    pub fn block(&self, system_id: SystemId) -> Option<&SystemBlock> {
        self.blocks.iter().find(|block| block.system_id == system_id)
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = BitWriter::with_capacity(
            64 + self.blocks.iter().map(|block| block.bytes.len() + 4).sum::<usize>(),
        );

        self.write_header(&mut writer);

        writer.align_to_byte();
        for block in &self.blocks {
            write_count(&mut writer, block.system_id as usize);
            write_count(&mut writer, block.bytes.len());
            writer.write_bytes(&block.bytes);
        }

        writer.to_bytes()
    }

    fn write_header(&self, writer: &mut BitWriter) {
        self.tick.ser(writer);
        self.full_remake.ser(writer);

        write_archetypes(writer, &self.archetypes);
        write_entities(writer, &self.entities);
        if !self.full_remake {
            write_removed(writer, &self.removed);
        }
        write_ownership(writer, &self.ownership);
    }

    pub fn read(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);

        let tick = Tick::de(&mut reader)?;
        let full_remake = bool::de(&mut reader)?;

        let archetypes = read_archetypes(&mut reader)?;
        let entities = read_entities(&mut reader)?;
        let removed = if full_remake {
            Vec::new()
        } else {
            read_removed(&mut reader)?
        };
        let ownership = read_ownership(&mut reader)?;

        reader.align_to_byte();
        let mut blocks = Vec::new();
        while reader.bits_remaining() >= 8 {
            let system_id: SystemId = read_count(&mut reader)?
                .try_into()
                .map_err(|_| SerdeErr::IntegerOverflow)?;
            let length = read_count(&mut reader)?;
            let bytes = reader.read_bytes(length)?;
            blocks.push(SystemBlock { system_id, bytes });
        }

        Ok(Self {
            tick,
            full_remake,
            archetypes,
            entities,
            removed,
            ownership,
            blocks,
        })
    }
}

fn write_archetypes(writer: &mut dyn BitWrite, archetypes: &[ArchetypeEntry]) {
    write_count(writer, archetypes.len());
    let mut ids = UnsignedDelta::new();
    for archetype in archetypes {
        ids.write(writer, archetype.id.value());
        write_count(writer, archetype.systems.len());
        let mut systems = UnsignedDelta::new();
        for system in &archetype.systems {
            systems.write(writer, *system);
        }
    }
}

fn read_archetypes(reader: &mut BitReader) -> Result<Vec<ArchetypeEntry>, SerdeErr> {
    let count = read_count(reader)?;
    let mut output = Vec::with_capacity(count.min(1024));
    let mut ids = UnsignedDelta::new();
    for _ in 0..count {
        let id = ArchetypeId::new(ids.read(reader)?);
        let system_count = read_count(reader)?;
        let mut systems = Vec::with_capacity(system_count.min(256));
        let mut system_ids = UnsignedDelta::new();
        for _ in 0..system_count {
            systems.push(system_ids.read(reader)?);
        }
        output.push(ArchetypeEntry { id, systems });
    }
    Ok(output)
}

fn write_entities(writer: &mut dyn BitWrite, entities: &[EntityEntry]) {
    write_count(writer, entities.len());
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    let mut origin_ids = UnsignedDelta::new();
    let mut origin_versions = UnsignedDelta::new();
    let mut archetypes = UnsignedDelta::new();
    let mut instigators = SignedDelta::new();
    for entry in entities {
        ids.write(writer, entry.entity.id);
        versions.write(writer, entry.entity.version);
        origin_ids.write(writer, entry.origin.id);
        origin_versions.write(writer, entry.origin.version);
        archetypes.write(writer, entry.archetype.value());
        instigators.write(writer, entry.origin_instigator);
    }
}

fn read_entities(reader: &mut BitReader) -> Result<Vec<EntityEntry>, SerdeErr> {
    let count = read_count(reader)?;
    let mut output = Vec::with_capacity(count.min(1024));
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    let mut origin_ids = UnsignedDelta::new();
    let mut origin_versions = UnsignedDelta::new();
    let mut archetypes = UnsignedDelta::new();
    let mut instigators = SignedDelta::new();
    for _ in 0..count {
        let entity = EntityRef::new(ids.read(reader)?, versions.read(reader)?);
        let origin = EntityRef::new(origin_ids.read(reader)?, origin_versions.read(reader)?);
        let archetype = ArchetypeId::new(archetypes.read(reader)?);
        let origin_instigator = instigators.read(reader)?;
        output.push(EntityEntry {
            entity,
            origin,
            archetype,
            origin_instigator,
        });
    }
    Ok(output)
}

fn write_removed(writer: &mut dyn BitWrite, removed: &[EntityRef]) {
    write_count(writer, removed.len());
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    for entity in removed {
        ids.write(writer, entity.id);
        versions.write(writer, entity.version);
    }
}

fn read_removed(reader: &mut BitReader) -> Result<Vec<EntityRef>, SerdeErr> {
    let count = read_count(reader)?;
    let mut output = Vec::with_capacity(count.min(1024));
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    for _ in 0..count {
        output.push(EntityRef::new(ids.read(reader)?, versions.read(reader)?));
    }
    Ok(output)
}

fn write_ownership(writer: &mut dyn BitWrite, ownership: &[OwnershipRecord]) {
    write_count(writer, ownership.len());
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    let mut archetypes = UnsignedDelta::new();
    let mut permissions = UnsignedDelta::new();
    for record in ownership {
        ids.write(writer, record.entity.id);
        versions.write(writer, record.entity.version);
        archetypes.write(writer, record.writable_archetype.value());
        permissions.write(writer, record.permissions.bits());
    }
}

fn read_ownership(reader: &mut BitReader) -> Result<Vec<OwnershipRecord>, SerdeErr> {
    let count = read_count(reader)?;
    let mut output = Vec::with_capacity(count.min(1024));
    let mut ids = UnsignedDelta::new();
    let mut versions = UnsignedDelta::new();
    let mut archetypes = UnsignedDelta::new();
    let mut permissions = UnsignedDelta::new();
    for _ in 0..count {
        let entity = EntityRef::new(ids.read(reader)?, versions.read(reader)?);
        let writable_archetype = ArchetypeId::new(archetypes.read(reader)?);
        let permissions = OwnershipPermissions::from_bits_truncate(permissions.read(reader)?);
        output.push(OwnershipRecord {
            entity,
            writable_archetype,
            permissions,
        });
    }
    Ok(output)
}
