pub mod movie;
pub mod node;
