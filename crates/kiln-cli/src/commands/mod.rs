//! Command implementations.

pub mod build;
pub mod check;
pub mod dev;
pub mod utils;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
