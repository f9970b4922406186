//! Gaussian MLP policy configured by a record's NPG block

pub mod gaussian;
pub mod network;

pub use gaussian::{ActionSample, GaussianMlp, PolicyConfig};
pub use network::{FcNetwork, Linear};
