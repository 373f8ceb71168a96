pub mod convert;
pub mod meter;
pub mod ring;
pub mod wav;
