pub mod snapshot_message;
