//! Input and output adapters of the command line driver.

pub mod csv;
pub mod json;
