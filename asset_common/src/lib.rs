pub mod artifact;
pub mod gpu;
pub mod scene;
pub mod transform;
