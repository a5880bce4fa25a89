pub mod justified;
pub mod scale;
pub mod viewport;

pub use justified::{pack, JustifiedPacker, PackParams};
pub use scale::ScaleController;
pub use viewport::{RowOffsets, VirtualWindow};
