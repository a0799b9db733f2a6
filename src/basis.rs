//! Hierarchical 1D shape functions and Gauss-Legendre quadrature point generation.
//!
//! Shape functions are evaluated along a single direction over a set of sample points;
//! 2D shapes are formed as tensor products by the space adapters in the selector.

mod glq;
mod legendre;

pub use glq::{gauss_quadrature_points, scale_gauss_quad_points};
pub use legendre::LegendreShapeFn;

/// Hierarchical shape function family along a single direction (defined over (-1.0, +1.0)).
/// [LegendreShapeFn] implements this trait; alternate families can be used by
/// implementing it
pub trait ShapeFn: Sync {
    /// Evaluate all orders `0..=max_order` (and their first derivatives) at the given points
    fn with(max_order: usize, points: &[f64]) -> Self;

    /// Value of the order-`n` shape at point `p`
    fn poly(&self, n: usize, p: usize) -> f64;

    /// First derivative of the order-`n` shape at point `p`
    fn poly_d1(&self, n: usize, p: usize) -> f64;
}

/// Direction of a shape function in a vector-valued basis. `W` designates the scalar
/// (undirected) shapes used by H1 and L2 spaces
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BasisDir {
    U,
    V,
    W,
}

/// Identifier of a single 2D shape function: directed expansion orders `i` (u-direction)
/// and `j` (v-direction), plus the basis direction for vector-valued spaces
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeIdx {
    pub i: u8,
    pub j: u8,
    pub dir: BasisDir,
}

impl ShapeIdx {
    pub const fn from(i: u8, j: u8, dir: BasisDir) -> Self {
        Self { i, j, dir }
    }
}
