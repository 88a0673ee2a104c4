//! # Mirra Shared
//! Entity replication core shared between mirra-server & mirra-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use mirra_serde::{
    read_count, write_count, BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, Serde,
    SerdeErr, SerdeInteger, SignedDelta, SignedInteger, SignedVariableInteger, UnsignedDelta,
    UnsignedInteger, UnsignedVariableInteger, zigzag_decode, zigzag_encode,
};

mod archetype;
mod config;
mod error;
mod instigator;
mod ownership;
mod snapshot;
mod system;
mod transport;
mod types;
mod wire;
mod work_group;
mod world;

pub use archetype::archetype_table::{ArchetypeId, ArchetypeTable};
pub use config::InstigatorConfig;
pub use error::{ReceiveError, ReplicationError};
pub use instigator::{
    broadcast_instigator::BroadcastInstigator,
    client_instigator::{ClientInstigator, OwnedGrant},
    receive_report::ReceiveReport,
};
pub use ownership::{
    error::OwnershipError,
    local_authority::LocalAuthority,
    pending_ownership::PendingOwnership,
    permissions::{OwnershipPermissions, OwnershipRecord},
};
pub use snapshot::{
    client_snapshot_state::{ClientSnapshotState, LocalGrant, RemoteRecord},
    host_snapshot_state::{ArchetypeChange, HostSnapshotState, RegisterSummary},
};
pub use system::{
    adapter::{BufferAdapter, ComponentAdapter, SnapshotAdapter},
    baseline_column::BaselineColumn,
    block::{decode_block, encode_block, DecodedBlock},
    delta_serializer::{BufferSerializer, ComponentSerializer, DeltaSerializer},
    error::RegistryError,
    merge_group::{MergeGroupCollection, PeerInfo},
    registry::{SystemRegistry, SystemRegistryBuilder},
    replicated::{ReplicatedBuffer, ReplicatedComponent},
    serializer_system::{ArchetypeUpdate, DeserializeTarget, SerializerSystem},
    snapshot::Snapshot,
};
pub use transport::Transport;
pub use types::{InstigatorId, PeerRole, SystemId, Tick};
pub use wire::snapshot_message::{ArchetypeEntry, EntityEntry, SnapshotMessage, SystemBlock};
pub use work_group::{Job, WorkGroup};
pub use world::{
    component_kind::{ComponentKind, LocalArchetype},
    entity_ref::EntityRef,
    snapshot_entity::SnapshotEntity,
    world_commands::{WorldCommand, WorldCommands},
    world_type::{BoxedComponent, WorldMutExt, WorldMutType, WorldRefExt, WorldRefType},
};
