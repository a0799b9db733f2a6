use super::proj_space::ProjSpace;
use crate::basis::{gauss_quadrature_points, scale_gauss_quad_points, ShapeFn, ShapeIdx};
use crate::domain::{PolyOrders, Split, SubTrf, V2D};

/// Squared-norm threshold below which a shape is considered to have negligible support
/// on a sub-domain and is excluded from the orthogonalization
const ORTHO_NORM_TOL: f64 = 1e-10;

/// Shape-function values tabulated at every quadrature point of one sub-transformation:
/// `[shape][component][gip]`, in both raw and orthogonalized form
pub struct TrfTable {
    pub trf: SubTrf,
    /// quadrature points in the parent element's reference coordinates
    pub points: Vec<V2D>,
    /// combined tensor quadrature weights, including the sub-transformation Jacobian
    pub weights: Vec<f64>,
    raw: Vec<Vec<Vec<f64>>>,
    ortho: Vec<Vec<Vec<f64>>>,
    ortho_map: Vec<Vec<f64>>,
}

impl TrfTable {
    fn with<Sp: ProjSpace, SF: ShapeFn>(
        space: &Sp,
        master: &[ShapeIdx],
        max_orders: PolyOrders,
        trf: SubTrf,
        glq_points: &[f64],
        glq_weights: &[f64],
    ) -> Self {
        let (u_scale, u_points) = scale_gauss_quad_points(
            glq_points,
            trf.offset[0] - trf.scale[0],
            trf.offset[0] + trf.scale[0],
        );
        let (v_scale, v_points) = scale_gauss_quad_points(
            glq_points,
            trf.offset[1] - trf.scale[1],
            trf.offset[1] + trf.scale[1],
        );

        let num_1d = glq_points.len();
        let num_gip = num_1d * num_1d;

        let mut points = Vec::with_capacity(num_gip);
        let mut weights = Vec::with_capacity(num_gip);
        for m in 0..num_1d {
            for n in 0..num_1d {
                points.push(V2D::from([u_points[m], v_points[n]]));
                weights.push(glq_weights[m] * glq_weights[n] * u_scale * v_scale);
            }
        }

        let u_shapes = SF::with(max_orders.i as usize, &u_points);
        let v_shapes = SF::with(max_orders.j as usize, &v_points);

        let raw: Vec<Vec<Vec<f64>>> = master
            .iter()
            .map(|idx| {
                let mut comps = vec![vec![0.0; num_gip]; space.num_comps()];
                let mut gip = 0;
                for m in 0..num_1d {
                    for n in 0..num_1d {
                        let values = space.shape_comps(&u_shapes, &v_shapes, *idx, m, n);
                        for (c, value) in values.iter().enumerate() {
                            comps[c][gip] = *value;
                        }
                        gip += 1;
                    }
                }
                comps
            })
            .collect();

        let (ortho, ortho_map) = orthogonalize(&raw, &weights);

        Self {
            trf,
            points,
            weights,
            raw,
            ortho,
            ortho_map,
        }
    }

    /// The full `[shape][component][gip]` table, raw or orthogonalized
    pub fn values(&self, use_ortho: bool) -> &[Vec<Vec<f64>>] {
        if use_ortho {
            &self.ortho
        } else {
            &self.raw
        }
    }

    /// Expansion of orthogonalized shape `k` over the raw shapes `0..=k`. Solutions
    /// computed against the orthogonalized tables are mapped through these rows so
    /// callers always receive coefficients of the raw shapes
    pub fn ortho_in_raw(&self, k: usize) -> &[f64] {
        &self.ortho_map[k]
    }

    /// Inner product of two component tables under this sub-domain's quadrature rule
    pub fn inner_product(&self, a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(a_comp, b_comp)| {
                a_comp
                    .iter()
                    .zip(b_comp.iter())
                    .zip(self.weights.iter())
                    .map(|((av, bv), w)| av * bv * w)
                    .sum::<f64>()
            })
            .sum()
    }
}

/// Modified Gram-Schmidt over the master shape ordering, with a re-orthogonalization
/// pass for numerical stability. Shapes with negligible support on the sub-domain are
/// left un-normalized and skipped as projection targets; the later least-squares
/// fallback tolerates them.
///
/// Alongside the orthogonalized tables, returns the change of basis: row `k` holds the
/// coefficients expressing orthogonalized shape `k` over the raw shapes `0..=k`
fn orthogonalize(raw: &[Vec<Vec<f64>>], weights: &[f64]) -> (Vec<Vec<Vec<f64>>>, Vec<Vec<f64>>) {
    let inner = |a: &[Vec<f64>], b: &[Vec<f64>]| -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ac, bc)| {
                ac.iter()
                    .zip(bc.iter())
                    .zip(weights.iter())
                    .map(|((av, bv), w)| av * bv * w)
                    .sum::<f64>()
            })
            .sum()
    };

    let mut ortho: Vec<Vec<Vec<f64>>> = Vec::with_capacity(raw.len());
    let mut maps: Vec<Vec<f64>> = Vec::with_capacity(raw.len());
    let mut normalized: Vec<bool> = Vec::with_capacity(raw.len());

    for (k, shape) in raw.iter().enumerate() {
        let mut vector = shape.clone();
        let mut map = vec![0.0; k + 1];
        map[k] = 1.0;

        for _pass in 0..2 {
            for (p, (prev, prev_normalized)) in ortho.iter().zip(normalized.iter()).enumerate() {
                if !prev_normalized {
                    continue;
                }
                let projection = inner(&vector, prev);
                for (v_comp, p_comp) in vector.iter_mut().zip(prev.iter()) {
                    for (v, p) in v_comp.iter_mut().zip(p_comp.iter()) {
                        *v -= projection * p;
                    }
                }
                for (m, p_coef) in maps[p].iter().enumerate() {
                    map[m] -= projection * p_coef;
                }
            }
        }

        let norm_sq = inner(&vector, &vector);
        if norm_sq > ORTHO_NORM_TOL {
            let inv_norm = 1.0 / norm_sq.sqrt();
            for v_comp in vector.iter_mut() {
                for v in v_comp.iter_mut() {
                    *v *= inv_norm;
                }
            }
            for coef in map.iter_mut() {
                *coef *= inv_norm;
            }
            normalized.push(true);
        } else {
            normalized.push(false);
        }

        ortho.push(vector);
        maps.push(map);
    }

    (ortho, maps)
}

/// Precomputed shape-function value tables for one element: the cross product of every
/// master shape and every sub-transformation required by the candidate set. Built once
/// per element and shared read-only across all of its candidates
pub struct ShapeValueCache {
    /// all shapes up to the maximum admissible orders, in deterministic class order
    pub master: Vec<ShapeIdx>,
    tables: [Vec<TrfTable>; 4],
}

impl ShapeValueCache {
    pub fn with<Sp: ProjSpace, SF: ShapeFn>(
        space: &Sp,
        max_orders: PolyOrders,
        splits: &[Split],
        num_glq: usize,
    ) -> Self {
        let (glq_points, glq_weights) = gauss_quadrature_points(num_glq);
        let master = space.shapes(max_orders);

        let mut tables: [Vec<TrfTable>; 4] = [vec![], vec![], vec![], vec![]];
        for split in splits {
            tables[split.rank()] = split
                .sub_trfs()
                .iter()
                .map(|trf| {
                    TrfTable::with::<Sp, SF>(
                        space,
                        &master,
                        max_orders,
                        *trf,
                        &glq_points,
                        &glq_weights,
                    )
                })
                .collect();
        }

        Self { master, tables }
    }

    pub fn table(&self, split: Split, son: usize) -> &TrfTable {
        &self.tables[split.rank()][son]
    }

    /// Positions (into the master list) of the shapes spanned by the given orders, and
    /// whether they form a prefix of the master ordering. Prefix subsets can use the
    /// orthogonalized tables directly; others fall back to the raw tables
    pub fn subset<Sp: ProjSpace>(&self, space: &Sp, orders: PolyOrders) -> (Vec<usize>, bool) {
        let subset: Vec<usize> = self
            .master
            .iter()
            .enumerate()
            .filter(|(_, idx)| space.contains(orders, **idx))
            .map(|(pos, _)| pos)
            .collect();

        let is_prefix = subset.iter().enumerate().all(|(k, pos)| k == *pos);
        (subset, is_prefix)
    }
}
