pub mod fields;
pub mod record;
pub mod tables;
