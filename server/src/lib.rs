//! # Mirra Server
//! A server that replicates registered entities to connected clients as
//! delta-compressed snapshots, and applies the entities clients create or
//! hold on lease.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use mirra_shared::{
        ArchetypeId, BitReader, BitWrite, BitWriter, BufferSerializer, ComponentSerializer,
        EntityRef, InstigatorId, OwnershipPermissions, ReceiveError, ReceiveReport,
        ReplicationError, Serde, SerdeErr, SystemRegistry, Tick, Transport, WorldMutType,
        WorldRefType,
    };
}

mod error;
mod server;
mod server_config;

pub use error::MirraServerError;
pub use server::Server;
pub use server_config::ServerConfig;
