use std::fmt;

/// Anisotropic polynomial expansion orders of an [Element] along the u- and v-directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolyOrders {
    pub i: u8,
    pub j: u8,
}

impl PolyOrders {
    pub const fn from(i: u8, j: u8) -> Self {
        Self { i, j }
    }

    /// Isotropic orders (same expansion order in both directions)
    pub const fn iso(order: u8) -> Self {
        Self { i: order, j: order }
    }

    /// Clamp both directed orders into `[min, max]`
    pub fn clamped(&self, min: u8, max: u8) -> Self {
        Self {
            i: self.i.clamp(min, max),
            j: self.j.clamp(min, max),
        }
    }

    pub fn max_order(&self) -> u8 {
        self.i.max(self.j)
    }

    pub fn total(&self) -> u16 {
        self.i as u16 + self.j as u16
    }
}

impl Default for PolyOrders {
    fn default() -> Self {
        Self { i: 1, j: 1 }
    }
}

impl fmt::Display for PolyOrders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Read-only view of a mesh element flagged for refinement. The mesh owns the full
/// topological description; the selector only needs the element's expansion orders
/// and whether its geometric mapping is curvilinear
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element {
    pub id: usize,
    pub poly_orders: PolyOrders,
    pub curved: bool,
}

impl Element {
    pub fn new(id: usize, poly_orders: PolyOrders) -> Self {
        Self {
            id,
            poly_orders,
            curved: false,
        }
    }

    pub fn new_curved(id: usize, poly_orders: PolyOrders) -> Self {
        Self {
            id,
            poly_orders,
            curved: true,
        }
    }
}
