//! Read-only description of the mesh elements handed to the selector, along with the
//! geometric sub-transformation tables implied by each type of h-refinement.

mod element;
mod h_refinement;
mod space_2d;

pub use element::{Element, PolyOrders};
pub use h_refinement::{Split, SubTrf};
pub use space_2d::V2D;
