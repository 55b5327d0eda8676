pub mod email;
pub mod memory;
pub mod postgres;
