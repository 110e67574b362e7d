// Utility modules

pub mod fs_ops;
pub mod paths;
