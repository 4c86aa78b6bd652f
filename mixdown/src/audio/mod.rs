//! Audio capability: decoding, resampling, remixing and encoding

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod resampler;
pub mod types;

pub use codec::{AudioCodec, CodecError, ExportFormat, SymphoniaCodec};
pub use types::PcmBuffer;
