//! Components and serializer systems shared by the integration tests.

use mirra_shared::{
    zigzag_decode, zigzag_encode, BitReader, BitWrite, BufferSerializer, ComponentSerializer,
    ReplicatedBuffer, ReplicatedComponent, Serde, SerdeErr, Snapshot, SystemId, SystemRegistry,
    SystemRegistryBuilder, UnsignedVariableInteger,
};

pub const POSITION: SystemId = 1;
pub const HEALTH: SystemId = 2;
pub const INVENTORY: SystemId = 3;
pub const SCORE: SystemId = 4;
pub const TEAM: SystemId = 5;

/// Delta-coded per axis as zigzag varints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

fn write_axis(writer: &mut dyn BitWrite, value: i32) {
    UnsignedVariableInteger::<7>::new(zigzag_encode(value)).ser(writer);
}

fn read_axis(reader: &mut BitReader) -> Result<i32, SerdeErr> {
    let raw: u32 = UnsignedVariableInteger::<7>::de(reader)?.try_to()?;
    Ok(zigzag_decode(raw))
}

impl Snapshot for Position {
    fn write_full(&self, writer: &mut dyn BitWrite) {
        write_axis(writer, self.x);
        write_axis(writer, self.y);
    }

    fn read_full(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            x: read_axis(reader)?,
            y: read_axis(reader)?,
        })
    }

    fn write_delta(&self, baseline: &Self, writer: &mut dyn BitWrite) {
        write_axis(writer, self.x.wrapping_sub(baseline.x));
        write_axis(writer, self.y.wrapping_sub(baseline.y));
    }

    fn read_delta(baseline: &Self, reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            x: baseline.x.wrapping_add(read_axis(reader)?),
            y: baseline.y.wrapping_add(read_axis(reader)?),
        })
    }
}

impl ReplicatedComponent for Position {
    type Snapshot = Position;

    fn to_snapshot(&self) -> Position {
        *self
    }

    fn from_snapshot(snapshot: &Position) -> Self {
        *snapshot
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health(pub u32);

impl ReplicatedComponent for Health {
    type Snapshot = u32;

    fn to_snapshot(&self) -> u32 {
        self.0
    }

    fn from_snapshot(snapshot: &u32) -> Self {
        Health(*snapshot)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory(pub Vec<u16>);

impl ReplicatedBuffer for Inventory {
    type Element = u16;

    fn elements(&self) -> &[u16] {
        &self.0
    }

    fn elements_mut(&mut self) -> &mut Vec<u16> {
        &mut self.0
    }

    fn from_elements(elements: Vec<u16>) -> Self {
        Inventory(elements)
    }
}

/// Uploaded for entities a client created, never leased.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Score(pub u16);

impl ReplicatedComponent for Score {
    type Snapshot = u16;

    fn to_snapshot(&self) -> u16 {
        self.0
    }

    fn from_snapshot(snapshot: &u16) -> Self {
        Score(*snapshot)
    }
}

/// Only ever written by the server: never leased, never uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Team(pub u8);

impl ReplicatedComponent for Team {
    type Snapshot = u8;

    fn to_snapshot(&self) -> u8 {
        self.0
    }

    fn from_snapshot(snapshot: &u8) -> Self {
        Team(*snapshot)
    }
}

/// Every test system, without building.
pub fn protocol_builder() -> SystemRegistryBuilder {
    SystemRegistry::builder()
        .add(ComponentSerializer::<Position>::new(POSITION))
        .add(ComponentSerializer::<Health>::new(HEALTH))
        .add(BufferSerializer::<Inventory>::new(INVENTORY))
        .add(ComponentSerializer::<Score>::new(SCORE).without_delegation())
        .add(
            ComponentSerializer::<Team>::new(TEAM)
                .without_delegation()
                .without_upload(),
        )
}

pub fn protocol() -> SystemRegistry {
    protocol_builder()
        .build()
        .expect("test protocol has unique system ids")
}

/// The test protocol minus the inventory system.
pub fn protocol_without_inventory() -> SystemRegistry {
    SystemRegistry::builder()
        .add(ComponentSerializer::<Position>::new(POSITION))
        .add(ComponentSerializer::<Health>::new(HEALTH))
        .add(ComponentSerializer::<Score>::new(SCORE).without_delegation())
        .add(
            ComponentSerializer::<Team>::new(TEAM)
                .without_delegation()
                .without_upload(),
        )
        .build()
        .expect("test protocol has unique system ids")
}

#[cfg(test)]
mod tests {
    use mirra_shared::{BitReader, BitWriter};

    use super::*;

    #[test]
    fn small_moves_are_one_byte_per_axis() {
        let before = Position::new(1000, -1000);
        let after = Position::new(1003, -1001);

        let mut writer = BitWriter::new();
        after.write_delta(&before, &mut writer);
        assert_eq!(writer.bits_written(), 16);

        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(Position::read_delta(&before, &mut reader).unwrap(), after);
    }
}
