mod error;
mod fs;
mod registry;

pub use error::RegistryError;
pub use fs::{FileReport, load_machine_file, validate_dir};
pub use registry::{MachineRegistry, MachineResolver};
