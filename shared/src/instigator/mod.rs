pub mod broadcast_instigator;
pub mod client_instigator;
pub mod receive_report;
