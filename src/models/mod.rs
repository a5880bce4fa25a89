pub mod item_sequence;
pub mod media_item;
pub mod row_model;
pub mod selection_store;

pub use item_sequence::*;
pub use media_item::*;
pub use row_model::*;
pub use selection_store::*;
