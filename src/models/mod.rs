pub mod enums;
pub mod request;
pub mod slot;

pub use enums::*;
pub use request::*;
pub use slot::*;
