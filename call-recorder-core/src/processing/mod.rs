pub mod encode_loop;
pub mod guards;
pub mod wav_codec;
pub mod wav_format;
