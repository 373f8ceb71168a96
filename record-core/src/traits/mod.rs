pub mod capture_device;
pub mod codec_sink;
pub mod host;
