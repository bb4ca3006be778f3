mod hold;
mod interval;
mod primitives;

pub use hold::*;
pub use interval::*;
pub use primitives::*;
