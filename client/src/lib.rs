//! # Mirra Client
//! A client that mirrors the entities a mirra server replicates, and uploads
//! the entities it creates or has been granted ownership of.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use mirra_shared::{
        BitReader, BitWrite, BitWriter, BufferSerializer, ComponentSerializer, EntityRef,
        InstigatorId, ReceiveError, ReceiveReport, ReplicationError, Serde, SerdeErr, SystemId,
        SystemRegistry, Tick, Transport, WorldMutType, WorldRefType,
    };
}

mod client;
mod client_config;

pub use client::Client;
pub use client_config::ClientConfig;
