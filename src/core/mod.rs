pub mod assembler;
pub mod picker;
pub mod recency;
pub mod session;
pub mod template;
