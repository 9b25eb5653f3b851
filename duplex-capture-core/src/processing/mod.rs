pub mod downmix;
pub mod frame_buffer;
pub mod stereo_mux;
