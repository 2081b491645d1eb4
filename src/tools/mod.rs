/// Local installation of the CLI tools kindup drives
pub mod installer;
pub mod platform;
pub mod toolchain;

pub use installer::{Tool, ToolInstaller};
pub use toolchain::Toolchain;
