pub mod challenge;
pub mod purge;
pub mod verify;
