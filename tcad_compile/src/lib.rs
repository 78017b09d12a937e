pub mod environment;
pub mod error;
pub mod interpret;
pub mod interrupt;
pub mod record;
pub mod resolve;
pub mod session;
pub mod stdlib;
pub mod symbol;
pub mod types;
