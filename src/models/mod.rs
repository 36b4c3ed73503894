// src/models/mod.rs
pub mod bin;
pub mod collection;
pub mod complaint;
pub mod driver;
pub mod fleet;
pub mod route;

pub use bin::*;
pub use collection::*;
pub use complaint::*;
pub use driver::*;
pub use fleet::*;
pub use route::*;
