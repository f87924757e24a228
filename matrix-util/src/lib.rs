pub mod dmatrix_util;
pub mod traits;
pub mod utils;

pub use nalgebra::{DMatrix, DVector};
