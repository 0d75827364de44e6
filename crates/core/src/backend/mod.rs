pub mod firebase;
pub mod memory;
pub mod subscription;
pub mod traits;
