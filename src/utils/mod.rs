pub mod geo;
pub mod html;
pub mod id_generator;

pub use id_generator::{IdGenerator, IdType, WithGeneratedId};
