pub mod media;
pub mod recording;
