//! Capability surface of the CAD authority the replay engine drives, plus a
//! deterministic in-memory implementation.

pub mod archive;
pub mod mock_authority;
mod profiles;
mod solid;
pub mod stl;
pub mod tessellation;
pub mod traits;
pub mod types;

pub use mock_authority::{Fault, MockAuthority};
pub use traits::*;
pub use types::*;
