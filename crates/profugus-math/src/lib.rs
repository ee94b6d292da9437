//! Linear algebra and iterative solvers for Profugus-RS.

pub mod anderson;
pub mod eigen;
pub mod gmres;
pub mod linalg;
pub mod operator;
pub mod solvers;
pub mod sparse;
