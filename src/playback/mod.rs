pub mod clock;
pub mod controller;
