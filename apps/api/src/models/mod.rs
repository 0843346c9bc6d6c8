pub mod candidate;
pub mod role;
