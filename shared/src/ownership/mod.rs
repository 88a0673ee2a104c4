pub mod error;
pub mod local_authority;
pub mod pending_ownership;
pub mod permissions;
