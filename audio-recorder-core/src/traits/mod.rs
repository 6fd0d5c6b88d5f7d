pub mod block_source;
pub mod session_observer;
