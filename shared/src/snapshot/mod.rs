pub mod client_snapshot_state;
pub mod host_snapshot_state;
