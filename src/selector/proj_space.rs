use crate::basis::{BasisDir, ShapeFn, ShapeIdx};
use crate::domain::{Element, PolyOrders, V2D};
use nalgebra::ComplexField;
use smallvec::{smallvec, SmallVec};

/// Values of a reference solution at a single parametric point: up to two vector
/// components and their u- and v-directed derivatives. Scalar spaces only read the
/// first component
#[derive(Clone, Copy, Debug)]
pub struct RefSample<S> {
    pub value: [S; 2],
    pub du: [S; 2],
    pub dv: [S; 2],
}

impl<S: ComplexField<RealField = f64> + Copy> RefSample<S> {
    /// Sample of a scalar-valued solution
    pub fn scalar(value: S, du: S, dv: S) -> Self {
        let zero = S::from_real(0.0);
        Self {
            value: [value, zero],
            du: [du, zero],
            dv: [dv, zero],
        }
    }

    /// Sample of a vector-valued solution
    pub fn vector(value: [S; 2], du: [S; 2], dv: [S; 2]) -> Self {
        Self { value, du, dv }
    }
}

/// The reference solution computed on a finer discretization. Implementations are
/// queried at quadrature points in the flagged element's parametric coordinates.
/// `None` indicates the reference solve has not covered the requested point, which is
/// fatal to that element's selection (the driver must retry once the reference
/// solution is available)
pub trait RefSolution<S: ComplexField<RealField = f64>>: Sync {
    fn sample(&self, elem_id: usize, point: V2D) -> Option<RefSample<S>>;
}

/// Space-specific behavior of the projection pipeline. One implementation per function
/// space; the candidate generator and projection solver are written once against this
/// trait and are oblivious to which space is active.
///
/// A shape function (and a reference sample) is expanded into a fixed set of
/// *components*; the space's inner product is the quadrature-weighted sum of
/// component-wise products. H1 uses value + gradient, L2 value only, H(curl) the two
/// vector components + curl, H(div) the two vector components + divergence
pub trait ProjSpace: Sync {
    /// Number of expansion components entering the inner product
    fn num_comps(&self) -> usize;

    /// Lowest admissible expansion order
    fn min_order(&self) -> u8;

    /// Highest expansion order supported by this space's shapeset
    fn max_supported_order(&self) -> u8;

    /// Amount the maximum order is reduced by on curvilinear elements
    fn curvature_penalty(&self) -> u8;

    /// The order range admissible for candidates on this element. The upper bound may
    /// fall below the lower one for degenerate curvature/order interactions; the
    /// candidate generator clamps that case to a single feasible candidate
    fn current_order_range(&self, elem: &Element, user_max: Option<u8>) -> (u8, u8) {
        let mut max = self.max_supported_order();
        if let Some(user_max) = user_max {
            max = max.min(user_max);
        }
        if elem.curved {
            max = max.saturating_sub(self.curvature_penalty());
        }
        (self.min_order(), max)
    }

    /// Number of shape functions (local DOFs) spanned by the given directed orders
    fn num_shapes(&self, orders: PolyOrders) -> usize;

    /// Whether a shape belongs to the expansion of the given directed orders
    fn contains(&self, orders: PolyOrders, idx: ShapeIdx) -> bool;

    /// The smallest isotropic order whose expansion contains this shape. Shapes are
    /// enumerated class-by-class so that isotropic expansions are prefixes of larger
    /// ones, which is what keeps the orthogonalized tables reusable across candidates
    fn shape_class(&self, idx: ShapeIdx) -> u8;

    /// All shapes of the given expansion, in a fixed deterministic order (ascending
    /// class, then direction, then directed orders)
    fn shapes(&self, orders: PolyOrders) -> Vec<ShapeIdx> {
        let mut out = Vec::with_capacity(self.num_shapes(orders));
        for class in 0..=orders.max_order().saturating_add(1) {
            for dir in [BasisDir::U, BasisDir::V, BasisDir::W] {
                for j in 0..=orders.j {
                    for i in 0..=orders.i {
                        let idx = ShapeIdx::from(i, j, dir);
                        if self.contains(orders, idx) && self.shape_class(idx) == class {
                            out.push(idx);
                        }
                    }
                }
            }
        }
        debug_assert_eq!(out.len(), self.num_shapes(orders));
        out
    }

    /// Expansion components of a shape function at tensor sample point `(m, n)`
    fn shape_comps<SF: ShapeFn>(
        &self,
        u_shapes: &SF,
        v_shapes: &SF,
        idx: ShapeIdx,
        m: usize,
        n: usize,
    ) -> SmallVec<[f64; 3]>;

    /// Expansion components of a reference-solution sample
    fn ref_comps<S: ComplexField<RealField = f64> + Copy>(
        &self,
        sample: &RefSample<S>,
    ) -> SmallVec<[S; 3]>;
}

/// H1 space: value + gradient inner product, scalar shapes
#[derive(Clone, Copy, Debug, Default)]
pub struct H1Space;

/// L2 space: value-only inner product, scalar shapes, order-0 expansions admissible
#[derive(Clone, Copy, Debug, Default)]
pub struct L2Space;

/// H(curl) space: u- and v-directed vector shapes with a curl term in the inner product
#[derive(Clone, Copy, Debug, Default)]
pub struct HCurlSpace;

/// H(div) space: u- and v-directed vector shapes with a divergence term in the inner product
#[derive(Clone, Copy, Debug, Default)]
pub struct HDivSpace;

impl ProjSpace for H1Space {
    fn num_comps(&self) -> usize {
        3
    }

    fn min_order(&self) -> u8 {
        1
    }

    fn max_supported_order(&self) -> u8 {
        9
    }

    fn curvature_penalty(&self) -> u8 {
        1
    }

    fn num_shapes(&self, orders: PolyOrders) -> usize {
        (orders.i as usize + 1) * (orders.j as usize + 1)
    }

    fn contains(&self, orders: PolyOrders, idx: ShapeIdx) -> bool {
        idx.dir == BasisDir::W && idx.i <= orders.i && idx.j <= orders.j
    }

    fn shape_class(&self, idx: ShapeIdx) -> u8 {
        idx.i.max(idx.j)
    }

    fn shape_comps<SF: ShapeFn>(
        &self,
        u_shapes: &SF,
        v_shapes: &SF,
        idx: ShapeIdx,
        m: usize,
        n: usize,
    ) -> SmallVec<[f64; 3]> {
        let (i, j) = (idx.i as usize, idx.j as usize);
        smallvec![
            u_shapes.poly(i, m) * v_shapes.poly(j, n),
            u_shapes.poly_d1(i, m) * v_shapes.poly(j, n),
            u_shapes.poly(i, m) * v_shapes.poly_d1(j, n),
        ]
    }

    fn ref_comps<S: ComplexField<RealField = f64> + Copy>(
        &self,
        sample: &RefSample<S>,
    ) -> SmallVec<[S; 3]> {
        smallvec![sample.value[0], sample.du[0], sample.dv[0]]
    }
}

impl ProjSpace for L2Space {
    fn num_comps(&self) -> usize {
        1
    }

    fn min_order(&self) -> u8 {
        0
    }

    fn max_supported_order(&self) -> u8 {
        9
    }

    fn curvature_penalty(&self) -> u8 {
        // TODO: L2 subtracts 2 where H1 and H(curl) subtract 1; unify these constants
        // once the reason for the discrepancy is pinned down
        2
    }

    fn num_shapes(&self, orders: PolyOrders) -> usize {
        (orders.i as usize + 1) * (orders.j as usize + 1)
    }

    fn contains(&self, orders: PolyOrders, idx: ShapeIdx) -> bool {
        idx.dir == BasisDir::W && idx.i <= orders.i && idx.j <= orders.j
    }

    fn shape_class(&self, idx: ShapeIdx) -> u8 {
        idx.i.max(idx.j)
    }

    fn shape_comps<SF: ShapeFn>(
        &self,
        u_shapes: &SF,
        v_shapes: &SF,
        idx: ShapeIdx,
        m: usize,
        n: usize,
    ) -> SmallVec<[f64; 3]> {
        smallvec![u_shapes.poly(idx.i as usize, m) * v_shapes.poly(idx.j as usize, n)]
    }

    fn ref_comps<S: ComplexField<RealField = f64> + Copy>(
        &self,
        sample: &RefSample<S>,
    ) -> SmallVec<[S; 3]> {
        smallvec![sample.value[0]]
    }
}

impl ProjSpace for HCurlSpace {
    fn num_comps(&self) -> usize {
        3
    }

    fn min_order(&self) -> u8 {
        1
    }

    fn max_supported_order(&self) -> u8 {
        6
    }

    fn curvature_penalty(&self) -> u8 {
        1
    }

    fn num_shapes(&self, orders: PolyOrders) -> usize {
        let (pi, pj) = (orders.i as usize, orders.j as usize);
        pi * (pj + 1) + (pi + 1) * pj
    }

    fn contains(&self, orders: PolyOrders, idx: ShapeIdx) -> bool {
        match idx.dir {
            BasisDir::U => idx.i + 1 <= orders.i && idx.j <= orders.j,
            BasisDir::V => idx.i <= orders.i && idx.j + 1 <= orders.j,
            BasisDir::W => false,
        }
    }

    fn shape_class(&self, idx: ShapeIdx) -> u8 {
        match idx.dir {
            BasisDir::U => (idx.i + 1).max(idx.j),
            BasisDir::V => idx.i.max(idx.j + 1),
            BasisDir::W => u8::MAX,
        }
    }

    fn shape_comps<SF: ShapeFn>(
        &self,
        u_shapes: &SF,
        v_shapes: &SF,
        idx: ShapeIdx,
        m: usize,
        n: usize,
    ) -> SmallVec<[f64; 3]> {
        let (i, j) = (idx.i as usize, idx.j as usize);
        match idx.dir {
            BasisDir::U => smallvec![
                u_shapes.poly(i, m) * v_shapes.poly(j, n),
                0.0,
                -u_shapes.poly(i, m) * v_shapes.poly_d1(j, n),
            ],
            BasisDir::V => smallvec![
                0.0,
                u_shapes.poly(i, m) * v_shapes.poly(j, n),
                u_shapes.poly_d1(i, m) * v_shapes.poly(j, n),
            ],
            BasisDir::W => unreachable!("H(curl) expansions contain no scalar shapes!"),
        }
    }

    fn ref_comps<S: ComplexField<RealField = f64> + Copy>(
        &self,
        sample: &RefSample<S>,
    ) -> SmallVec<[S; 3]> {
        smallvec![
            sample.value[0],
            sample.value[1],
            sample.du[1] - sample.dv[0],
        ]
    }
}

impl ProjSpace for HDivSpace {
    fn num_comps(&self) -> usize {
        3
    }

    fn min_order(&self) -> u8 {
        1
    }

    fn max_supported_order(&self) -> u8 {
        6
    }

    fn curvature_penalty(&self) -> u8 {
        1
    }

    fn num_shapes(&self, orders: PolyOrders) -> usize {
        let (pi, pj) = (orders.i as usize, orders.j as usize);
        (pi + 1) * pj + pi * (pj + 1)
    }

    fn contains(&self, orders: PolyOrders, idx: ShapeIdx) -> bool {
        match idx.dir {
            BasisDir::U => idx.i <= orders.i && idx.j + 1 <= orders.j,
            BasisDir::V => idx.i + 1 <= orders.i && idx.j <= orders.j,
            BasisDir::W => false,
        }
    }

    fn shape_class(&self, idx: ShapeIdx) -> u8 {
        match idx.dir {
            BasisDir::U => idx.i.max(idx.j + 1),
            BasisDir::V => (idx.i + 1).max(idx.j),
            BasisDir::W => u8::MAX,
        }
    }

    fn shape_comps<SF: ShapeFn>(
        &self,
        u_shapes: &SF,
        v_shapes: &SF,
        idx: ShapeIdx,
        m: usize,
        n: usize,
    ) -> SmallVec<[f64; 3]> {
        let (i, j) = (idx.i as usize, idx.j as usize);
        match idx.dir {
            BasisDir::U => smallvec![
                u_shapes.poly(i, m) * v_shapes.poly(j, n),
                0.0,
                u_shapes.poly_d1(i, m) * v_shapes.poly(j, n),
            ],
            BasisDir::V => smallvec![
                0.0,
                u_shapes.poly(i, m) * v_shapes.poly(j, n),
                u_shapes.poly(i, m) * v_shapes.poly_d1(j, n),
            ],
            BasisDir::W => unreachable!("H(div) expansions contain no scalar shapes!"),
        }
    }

    fn ref_comps<S: ComplexField<RealField = f64> + Copy>(
        &self,
        sample: &RefSample<S>,
    ) -> SmallVec<[S; 3]> {
        smallvec![
            sample.value[0],
            sample.value[1],
            sample.du[0] + sample.dv[1],
        ]
    }
}
