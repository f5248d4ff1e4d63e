//! Type identity: canonical type paths and the tags written into streams.

mod cell;
mod dynamic;
mod type_path;
mod type_tag;

pub use cell::{GenericPathCell, concat};
pub use dynamic::{Dynamic, tag_of};
pub use type_path::TypePath;
pub use type_tag::TypeTag;
