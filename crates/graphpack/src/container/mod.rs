//! Binary container format: self-describing schema block plus
//! synchronized, optionally-compressed record blocks.

pub mod codec;
pub mod primitives;
pub mod reader;
pub mod writer;

pub use codec::Codec;
pub use primitives::{Reader, Writer, zigzag_decode, zigzag_encode};
pub use reader::{ContainerReader, Records};
pub use writer::ContainerWriter;
