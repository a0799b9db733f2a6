use super::asm_list::AsmList;
use super::candidates::Candidate;
use super::proj_space::{ProjSpace, RefSolution};
use super::shape_cache::{ShapeValueCache, TrfTable};
use super::SelectionError;
use crate::domain::Element;
use nalgebra::{ComplexField, DMatrix, DVector};
use smallvec::SmallVec;

/// Singular values below this threshold are truncated by the least-squares fallback
const LSQ_EPS: f64 = 1e-12;

/// Outcome of projecting the reference solution onto one candidate's approximation
/// space: the squared projection error (total and per son), the candidate's local DOF
/// count, and the projection coefficients. Transient; discarded once a winner is chosen
#[derive(Clone, Debug)]
pub struct CandidateResult<S> {
    pub candidate: Candidate,
    pub error_sq: f64,
    pub son_errors: SmallVec<[f64; 4]>,
    pub dofs: usize,
    pub degraded: bool,
    pub coefs: SmallVec<[AsmList<S>; 4]>,
}

/// Reference-solution expansion components tabulated at one sub-domain's quadrature
/// points, along with the squared norm of the reference solution over that sub-domain
pub(crate) struct RefValueTable<S> {
    comps: Vec<SmallVec<[S; 3]>>,
    norm_sq: f64,
}

/// Evaluate the reference solution at every quadrature point of one sub-domain
pub(crate) fn precalc_ref_solution<S, Sp, R>(
    space: &Sp,
    rsln: &R,
    elem: &Element,
    table: &TrfTable,
    son: usize,
) -> Result<RefValueTable<S>, SelectionError>
where
    S: ComplexField<RealField = f64> + Copy,
    Sp: ProjSpace,
    R: RefSolution<S>,
{
    let mut comps = Vec::with_capacity(table.points.len());
    for point in &table.points {
        let sample =
            rsln.sample(elem.id, *point)
                .ok_or(SelectionError::MissingRefValues {
                    elem_id: elem.id,
                    son,
                })?;
        comps.push(space.ref_comps(&sample));
    }

    let norm_sq = comps
        .iter()
        .zip(table.weights.iter())
        .map(|(point_comps, w)| {
            point_comps
                .iter()
                .map(|c| c.modulus_squared())
                .sum::<f64>()
                * w
        })
        .sum();

    Ok(RefValueTable { comps, norm_sq })
}

/// Project the reference solution onto a candidate's approximation space, one son at a
/// time, and accumulate the squared projection error.
///
/// Per son: assemble the Gram matrix `M` of the son's shape subset under the space's
/// inner product and the right-hand side `b` against the reference values, solve
/// `M x = b` by Cholesky (falling back to a truncated-SVD least-squares solve on
/// indefinite `M`, which marks the candidate as degraded), and evaluate the squared
/// error through the projection residual identity `‖ref‖² − Re(xᴴb)`.
///
/// Prefix subsets are solved against the orthogonalized tables for conditioning; the
/// solution is mapped back through the stored change of basis so the returned
/// [AsmList]s always carry coefficients of the raw shapes named by their shape indices
pub(crate) fn project_candidate<S, Sp>(
    space: &Sp,
    cache: &ShapeValueCache,
    ref_tables: &[RefValueTable<S>],
    candidate: Candidate,
) -> CandidateResult<S>
where
    S: ComplexField<RealField = f64> + Copy,
    Sp: ProjSpace,
{
    let mut son_errors: SmallVec<[f64; 4]> = SmallVec::new();
    let mut coefs: SmallVec<[AsmList<S>; 4]> = SmallVec::new();
    let mut dofs = 0;
    let mut degraded = false;

    for (son, orders) in candidate.son_orders.iter().enumerate() {
        let table = cache.table(candidate.split, son);
        let ref_table = &ref_tables[son];

        let (subset, is_prefix) = cache.subset(space, *orders);
        let values = table.values(is_prefix);
        let num_shapes = subset.len();

        if num_shapes == 0 {
            son_errors.push(ref_table.norm_sq.max(0.0));
            coefs.push(AsmList::new());
            continue;
        }

        let gram = DMatrix::from_fn(num_shapes, num_shapes, |a, b| {
            table.inner_product(&values[subset[a]], &values[subset[b]])
        });

        let rhs = DVector::from_fn(num_shapes, |k, _| {
            let shape = &values[subset[k]];
            let mut entry = S::from_real(0.0);
            for (gip, (point_comps, w)) in ref_table
                .comps
                .iter()
                .zip(table.weights.iter())
                .enumerate()
            {
                for (c, ref_comp) in point_comps.iter().enumerate() {
                    entry += *ref_comp * S::from_real(shape[c][gip] * w);
                }
            }
            entry
        });

        let gram_s = gram.map(|entry| S::from_real(entry));
        let solution: DVector<S> = match gram_s.clone().cholesky() {
            Some(decomp) => decomp.solve(&rhs),
            None => {
                degraded = true;
                gram_s
                    .svd(true, true)
                    .solve(&rhs, LSQ_EPS)
                    .unwrap_or_else(|_| DVector::from_element(num_shapes, S::from_real(0.0)))
            }
        };

        let projected_sq: f64 = (0..num_shapes)
            .map(|k| (solution[k].conjugate() * rhs[k]).real())
            .sum();
        son_errors.push((ref_table.norm_sq - projected_sq).max(0.0));

        let mut asm_list = AsmList::new();
        if is_prefix {
            // map the ortho-basis solution back onto the raw shapes (the change of
            // basis is lower triangular over the master ordering)
            for (j, position) in subset.iter().enumerate() {
                let mut coef = S::from_real(0.0);
                for k in j..num_shapes {
                    coef += solution[k] * S::from_real(table.ortho_in_raw(subset[k])[j]);
                }
                asm_list.add_triplet(cache.master[*position], dofs + j, coef);
            }
        } else {
            for (k, position) in subset.iter().enumerate() {
                asm_list.add_triplet(cache.master[*position], dofs + k, solution[k]);
            }
        }
        coefs.push(asm_list);

        dofs += num_shapes;
    }

    CandidateResult {
        candidate,
        error_sq: son_errors.iter().sum(),
        son_errors,
        dofs,
        degraded,
        coefs,
    }
}
