pub mod audio_backend;
pub mod frame_sink;
