pub mod matrix;
mod io;

pub use matrix::Matrix2;
pub use matrix::Matrix3;

pub use io::{enumerate_input_files, Args};
pub use clap::Parser;
