pub mod compare;
pub mod interpolate;
pub mod primitives;
