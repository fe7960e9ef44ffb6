pub mod certificates;
pub mod image;
pub mod security;
pub mod streaming;
pub mod system;
