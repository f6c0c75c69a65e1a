//! Data model: samples, parsing, buffers and the views derived from them.

pub mod buffer;
pub mod export;
pub mod parser;
pub mod render;
pub mod resample;
pub mod sample;
pub mod time_format;
