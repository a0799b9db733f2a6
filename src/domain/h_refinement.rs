use super::V2D;

/*
    Layout of son indices for each type of refinement (T-sons follow the
    quadrant convention SW, SE, NW, NE; U- and V-sons are ordered BL, TR):

    T :                     U :                     V :
    2 --------- 3           2 --------- 3           2 --------- 3
    |  2  |  3  |           |     |     |           |     1     |
    |-----------|           |  0  |  1  |           |-----------|
    |  0  |  1  |           |     |     |           |     0     |
    0 --------- 1           0 --------- 1           0 --------- 1
*/

/// Description of a refinement's geometry: an order-only refinement (`P`) or one of
/// the three ways a quadrilateral [Element](super::Element) can be split into sons
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    /// no geometric split; the element is kept whole and only its expansion orders change
    P,
    /// isotropic split into four sons
    T,
    /// anisotropic split about the u-direction
    U,
    /// anisotropic split about the v-direction
    V,
}

impl Split {
    /// The three geometric splits (`P` excluded)
    pub const GEOMETRIC: [Split; 3] = [Split::T, Split::U, Split::V];

    /// Number of sons produced by this refinement
    pub fn num_sons(&self) -> usize {
        match self {
            Self::P => 1,
            Self::T => 4,
            Self::U | Self::V => 2,
        }
    }

    /// Fixed rank used for deterministic iteration and tie-breaking
    pub fn rank(&self) -> usize {
        match self {
            Self::P => 0,
            Self::T => 1,
            Self::U => 2,
            Self::V => 3,
        }
    }

    /// The affine maps from each son's reference domain back into the parent's
    /// `[-1, 1]²` reference domain
    pub fn sub_trfs(&self) -> &'static [SubTrf] {
        match self {
            Self::P => &IDENTITY_TRF,
            Self::T => &QUADRANT_TRFS,
            Self::U => &U_HALF_TRFS,
            Self::V => &V_HALF_TRFS,
        }
    }
}

/// An affine transformation mapping a son's reference domain into a sub-domain of its
/// parent's reference domain
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubTrf {
    pub scale: V2D,
    pub offset: V2D,
}

impl SubTrf {
    const fn from(scale: [f64; 2], offset: [f64; 2]) -> Self {
        Self {
            scale: V2D::from(scale),
            offset: V2D::from(offset),
        }
    }

    /// Map a point from son reference coordinates to parent reference coordinates
    pub fn apply(&self, point: V2D) -> V2D {
        point * self.scale + self.offset
    }

    /// Determinant of the (diagonal) transformation Jacobian
    pub fn jacobian(&self) -> f64 {
        self.scale[0] * self.scale[1]
    }
}

const IDENTITY_TRF: [SubTrf; 1] = [SubTrf::from([1.0, 1.0], [0.0, 0.0])];

const QUADRANT_TRFS: [SubTrf; 4] = [
    SubTrf::from([0.5, 0.5], [-0.5, -0.5]),
    SubTrf::from([0.5, 0.5], [0.5, -0.5]),
    SubTrf::from([0.5, 0.5], [-0.5, 0.5]),
    SubTrf::from([0.5, 0.5], [0.5, 0.5]),
];

const U_HALF_TRFS: [SubTrf; 2] = [
    SubTrf::from([0.5, 1.0], [-0.5, 0.0]),
    SubTrf::from([0.5, 1.0], [0.5, 0.0]),
];

const V_HALF_TRFS: [SubTrf; 2] = [
    SubTrf::from([1.0, 0.5], [0.0, -0.5]),
    SubTrf::from([1.0, 0.5], [0.0, 0.5]),
];
