pub mod radial;
