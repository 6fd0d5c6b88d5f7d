pub mod push;
pub mod synthetic;
