pub mod carrier;
pub mod input;
pub mod profile;
pub mod registry;
pub mod retrofit;
pub mod technology;
pub mod time;

pub use carrier::*;
pub use input::*;
pub use profile::*;
pub use registry::*;
pub use retrofit::*;
pub use technology::*;
pub use time::*;
