pub mod classifier;
pub mod client;
pub mod fast_pass;
pub mod normalize;
pub mod prompts;
pub mod vision;

pub use classifier::*;
pub use client::*;
pub use fast_pass::*;
pub use vision::*;
