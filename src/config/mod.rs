mod loader;
mod structs;

pub use loader::offset_from_minutes;
pub use structs::*;
