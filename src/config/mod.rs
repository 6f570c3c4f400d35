pub mod loader;
pub mod settings;

pub use loader::*;
pub use settings::*;
