pub mod consts;
pub mod decoder;
pub mod encoding;
pub mod frame;
pub mod handshake;
pub mod masking;
pub mod opcode;

pub use decoder::{DecoderTotals, FrameDecoder, Phase, Progress};
pub use encoding::{encode_close_frame, encode_frame};
pub use frame::{Direction, FrameEvent, FrameHeader};
pub use masking::unmask;
pub use opcode::Opcode;
