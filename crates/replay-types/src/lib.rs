pub mod connection;
pub mod log;
pub mod result;
pub mod task;

pub use connection::*;
pub use log::*;
pub use result::*;
pub use task::*;
