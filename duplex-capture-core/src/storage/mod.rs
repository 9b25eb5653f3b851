pub mod export;
pub mod external_encoder;
pub mod flac_writer;
pub mod metadata;
pub mod vorbis_writer;
pub mod wav_writer;
