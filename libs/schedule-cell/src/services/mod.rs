pub mod overlap;
pub mod restore;
pub mod schedule;
pub mod slots;
