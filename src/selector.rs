//! The projection-based candidate evaluation and scoring pipeline.
//!
//! [ProjBasedSelector] drives one element's selection: it enumerates the admissible
//! refinement candidates, precomputes shape-function and reference-solution value
//! tables across the required sub-transformations, projects the reference solution
//! onto every candidate's approximation space, and returns the candidate with the best
//! error-per-DOF score.
//!
//! Selection for one element is a pure computation over read-only state; different
//! elements can be evaluated in parallel via [ProjBasedSelector::select_refinements].

mod asm_list;
mod candidates;
mod proj_space;
mod projection;
mod score;
mod shape_cache;

pub use asm_list::{AsmEntry, AsmList};
pub use candidates::{create_candidates, CandList, Candidate, MAX_P_INCREMENT};
pub use proj_space::{H1Space, HCurlSpace, HDivSpace, L2Space, ProjSpace, RefSample, RefSolution};
pub use projection::CandidateResult;
pub use score::Selection;
pub use shape_cache::{ShapeValueCache, TrfTable};

use crate::basis::{LegendreShapeFn, ShapeFn};
use crate::domain::{Element, PolyOrders, Split};
use nalgebra::ComplexField;
use projection::{precalc_ref_solution, project_candidate, RefValueTable};
use rayon::prelude::*;
use score::select_best;
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::marker::PhantomData;

/// Minimum number of Gauss Legendre Quadrature points allowed per direction
pub const MIN_GLQ_ORDER: usize = 4;

/// Error type for candidate selection
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionError {
    /// the convergence exponent must be finite and positive
    InvalidConvExp(f64),
    /// too few quadrature points were requested
    InvalidGlqSettings(usize),
    /// the candidate-list policy produced no candidates for the element
    EmptyCandidateList(usize),
    /// the reference solution has not been computed over a required sub-element; the
    /// driver must retry once the reference solve is available
    MissingRefValues { elem_id: usize, son: usize },
    /// every candidate failed to add DOFs; the element cannot be refined further
    NoViableCandidate { elem_id: usize },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidConvExp(conv_exp) => write!(
                f,
                "Convergence exponent ({}) must be finite and positive; cannot construct selector!",
                conv_exp
            ),
            Self::InvalidGlqSettings(num_glq) => write!(
                f,
                "At least {} GLQ points are required per direction ({} were requested); cannot construct selector!",
                MIN_GLQ_ORDER, num_glq
            ),
            Self::EmptyCandidateList(elem_id) => write!(
                f,
                "Candidate-list policy produced no candidates for Elem {}; cannot select a refinement!",
                elem_id
            ),
            Self::MissingRefValues { elem_id, son } => write!(
                f,
                "Reference solution is unavailable over son {} of Elem {}; cannot select a refinement!",
                son, elem_id
            ),
            Self::NoViableCandidate { elem_id } => write!(
                f,
                "No candidate adds DOFs to Elem {}; cannot select a refinement!",
                elem_id
            ),
        }
    }
}

/// Selects the best refinement for flagged elements by projecting a reference solution
/// onto every admissible candidate's approximation space.
///
/// Construction may precede the adaptivity loop; one selector instance serves the whole
/// run. The space adapter `Sp` fixes the inner product and shape sets; the shape
/// function family `SF` defaults to [LegendreShapeFn]
pub struct ProjBasedSelector<Sp: ProjSpace, SF: ShapeFn = LegendreShapeFn> {
    space: Sp,
    cand_list: CandList,
    conv_exp: f64,
    max_order: Option<u8>,
    num_glq: Option<usize>,
    shape_type: PhantomData<SF>,
}

impl<Sp: ProjSpace, SF: ShapeFn> ProjBasedSelector<Sp, SF> {
    /// Construct a selector with a candidate-list policy, a convergence exponent
    /// (1.0 weighs error reduction and DOF cost equally), and an optional cap on the
    /// expansion order (`None` uses the space's maximum supported order)
    pub fn with(
        space: Sp,
        cand_list: CandList,
        conv_exp: f64,
        max_order: Option<u8>,
    ) -> Result<Self, SelectionError> {
        if !conv_exp.is_finite() || conv_exp <= 0.0 {
            return Err(SelectionError::InvalidConvExp(conv_exp));
        }

        Ok(Self {
            space,
            cand_list,
            conv_exp,
            max_order,
            num_glq: None,
            shape_type: PhantomData,
        })
    }

    /// Override the number of quadrature points used per direction (the default is
    /// derived from the maximum admissible order)
    pub fn with_glq_points(mut self, num_glq: usize) -> Result<Self, SelectionError> {
        if num_glq < MIN_GLQ_ORDER {
            return Err(SelectionError::InvalidGlqSettings(num_glq));
        }
        self.num_glq = Some(num_glq);
        Ok(self)
    }

    /// Select the best refinement candidate for one element.
    ///
    /// Returns the winning [Candidate] along with its predicted squared error and DOF
    /// delta. Fails if the reference solution does not cover the element or if no
    /// candidate adds DOFs
    pub fn select_refinement<S, R>(
        &self,
        elem: &Element,
        rsln: &R,
    ) -> Result<Selection<S>, SelectionError>
    where
        S: ComplexField<RealField = f64> + Copy,
        R: RefSolution<S>,
    {
        let (min_order, max_order) = self.space.current_order_range(elem, self.max_order);
        let candidates = create_candidates(elem, self.cand_list, min_order, max_order);
        if candidates.is_empty() {
            return Err(SelectionError::EmptyCandidateList(elem.id));
        }

        // the splits actually proposed; the baseline always contributes Split::P
        let mut splits: SmallVec<[Split; 4]> = smallvec![Split::P];
        for candidate in &candidates {
            if !splits.contains(&candidate.split) {
                splits.push(candidate.split);
            }
        }

        let top_order = max_order.max(min_order);
        let num_glq = self
            .num_glq
            .unwrap_or((top_order as usize + 2).max(MIN_GLQ_ORDER));

        // precompute shape values (shared across all candidates of this element)
        let cache = ShapeValueCache::with::<Sp, SF>(
            &self.space,
            PolyOrders::iso(top_order),
            &splits,
            num_glq,
        );

        // precompute reference-solution values per (split, son)
        let mut ref_tables: [Vec<RefValueTable<S>>; 4] = [vec![], vec![], vec![], vec![]];
        for split in &splits {
            ref_tables[split.rank()] = (0..split.num_sons())
                .map(|son| {
                    precalc_ref_solution(
                        &self.space,
                        rsln,
                        elem,
                        cache.table(*split, son),
                        son,
                    )
                })
                .collect::<Result<_, _>>()?;
        }

        let results: Vec<CandidateResult<S>> = candidates
            .into_iter()
            .map(|candidate| {
                let split_tables = &ref_tables[candidate.split.rank()];
                project_candidate(&self.space, &cache, split_tables, candidate)
            })
            .collect();

        let current_dofs = self.space.num_shapes(elem.poly_orders);
        select_best(results, current_dofs, self.conv_exp, elem.id)
    }

    /// Select refinements for a set of elements in parallel over the Rayon global
    /// threadpool. Elements share no mutable state; results are returned in input order
    pub fn select_refinements<S, R>(
        &self,
        elems: &[Element],
        rsln: &R,
    ) -> Vec<(usize, Result<Selection<S>, SelectionError>)>
    where
        S: ComplexField<RealField = f64> + Copy + Send + Sync,
        R: RefSolution<S>,
    {
        elems
            .par_iter()
            .map(|elem| (elem.id, self.select_refinement(elem, rsln)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::V2D;
    use num_complex::Complex64;

    // smooth scalar reference solution: f = (u + 0.3)⁴ (v − 0.2)³
    struct SmoothRef;

    impl RefSolution<f64> for SmoothRef {
        fn sample(&self, _elem_id: usize, point: V2D) -> Option<RefSample<f64>> {
            let (u, v) = (point[0] + 0.3, point[1] - 0.2);
            Some(RefSample::scalar(
                u.powi(4) * v.powi(3),
                4.0 * u.powi(3) * v.powi(3),
                3.0 * u.powi(4) * v.powi(2),
            ))
        }
    }

    // quadratic scalar reference solution: exactly representable at order (2, 2) but
    // not at (1, 1)
    struct QuadraticRef;

    impl RefSolution<f64> for QuadraticRef {
        fn sample(&self, _elem_id: usize, point: V2D) -> Option<RefSample<f64>> {
            Some(RefSample::scalar(
                point[0] * point[0] - 0.75 * point[1],
                2.0 * point[0],
                -0.75,
            ))
        }
    }

    struct ComplexConstRef;

    impl RefSolution<Complex64> for ComplexConstRef {
        fn sample(&self, _elem_id: usize, _point: V2D) -> Option<RefSample<Complex64>> {
            let zero = Complex64::new(0.0, 0.0);
            Some(RefSample::scalar(Complex64::new(1.5, -2.0), zero, zero))
        }
    }

    // constant vector field: exactly representable in any order ≥ 1 vector expansion
    struct ConstVecRef;

    impl RefSolution<f64> for ConstVecRef {
        fn sample(&self, _elem_id: usize, _point: V2D) -> Option<RefSample<f64>> {
            Some(RefSample::vector([1.0, 2.0], [0.0, 0.0], [0.0, 0.0]))
        }
    }

    // reference solution that was never computed over the upper half of the element
    struct PartialRef;

    impl RefSolution<f64> for PartialRef {
        fn sample(&self, _elem_id: usize, point: V2D) -> Option<RefSample<f64>> {
            if point[1] > 0.0 {
                None
            } else {
                Some(RefSample::scalar(1.0, 0.0, 0.0))
            }
        }
    }

    #[test]
    fn l2_quadratic_reference_projects_exactly_at_order_two() {
        let selector =
            ProjBasedSelector::<L2Space>::with(L2Space, CandList::PIso, 1.0, None).unwrap();
        let elem = Element::new(0, PolyOrders::iso(1));

        let selection = selector
            .select_refinement::<f64, _>(&elem, &QuadraticRef)
            .unwrap();

        // order 2 already captures the solution; order 3 gains nothing for more DOFs
        assert!(selection.predicted_error_sq < 1e-12);
        assert_eq!(selection.candidate.split, Split::P);
        assert_eq!(selection.candidate.son_orders[0], PolyOrders::iso(2));
        assert_eq!(selection.dof_delta, 9 - 4);
    }

    #[test]
    fn error_decreases_monotonically_with_son_order() {
        let space = H1Space;
        let cache = ShapeValueCache::with::<H1Space, LegendreShapeFn>(
            &space,
            PolyOrders::iso(5),
            &[Split::T],
            8,
        );
        let elem = Element::new(0, PolyOrders::iso(1));

        let ref_tables: Vec<RefValueTable<f64>> = (0..4)
            .map(|son| {
                precalc_ref_solution(&space, &SmoothRef, &elem, cache.table(Split::T, son), son)
                    .unwrap()
            })
            .collect();

        let errors: Vec<f64> = (1..=5)
            .map(|order| {
                let son_orders = (0..4).map(|_| PolyOrders::iso(order)).collect();
                let result = project_candidate(
                    &space,
                    &cache,
                    &ref_tables,
                    Candidate::with_split(Split::T, son_orders),
                );
                assert!(result.error_sq >= 0.0);
                assert!(!result.degraded);
                result.error_sq
            })
            .collect();

        for pair in errors.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-12,
                "error increased with order: {:?}",
                errors
            );
        }

        // degree (4, 3) is fully captured at order 4
        assert!(errors[3] < 1e-12);
    }

    #[test]
    fn dof_deltas_match_shape_count_differences() {
        let space = H1Space;
        let elem = Element::new(0, PolyOrders::iso(2));
        let current_dofs = space.num_shapes(elem.poly_orders);

        let candidates = create_candidates(&elem, CandList::HpAniso, 1, 9);
        let cache = ShapeValueCache::with::<H1Space, LegendreShapeFn>(
            &space,
            PolyOrders::iso(9),
            &[Split::P, Split::T, Split::U, Split::V],
            11,
        );

        for candidate in candidates {
            let ref_tables: Vec<RefValueTable<f64>> = (0..candidate.split.num_sons())
                .map(|son| {
                    precalc_ref_solution(
                        &space,
                        &SmoothRef,
                        &elem,
                        cache.table(candidate.split, son),
                        son,
                    )
                    .unwrap()
                })
                .collect();

            let expected_dofs: usize = candidate
                .son_orders
                .iter()
                .map(|orders| space.num_shapes(*orders))
                .sum();

            let result = project_candidate(&space, &cache, &ref_tables, candidate);
            assert_eq!(result.dofs, expected_dofs);

            if result.dofs > current_dofs {
                assert!(result.dofs - current_dofs > 0);
            }
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpAniso, 1.0, None).unwrap();
        let elem = Element::new(3, PolyOrders::from(2, 1));

        let first = selector
            .select_refinement::<f64, _>(&elem, &SmoothRef)
            .unwrap();
        let second = selector
            .select_refinement::<f64, _>(&elem, &SmoothRef)
            .unwrap();

        assert_eq!(first.candidate, second.candidate);
        assert_eq!(first.dof_delta, second.dof_delta);
        assert_eq!(first.score.to_bits(), second.score.to_bits());
        assert_eq!(
            first.predicted_error_sq.to_bits(),
            second.predicted_error_sq.to_bits()
        );
    }

    #[test]
    fn curved_elements_never_exceed_the_reduced_max_order() {
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HIso, 1.0, None).unwrap();
        let elem = Element::new_curved(0, PolyOrders::iso(9));

        let selection = selector
            .select_refinement::<f64, _>(&elem, &SmoothRef)
            .unwrap();

        assert_eq!(selection.candidate.split, Split::T);
        for orders in &selection.candidate.son_orders {
            assert!(orders.max_order() <= 8);
        }
    }

    #[test]
    fn complex_valued_solutions_are_supported() {
        let selector =
            ProjBasedSelector::<L2Space>::with(L2Space, CandList::PIso, 1.0, None).unwrap();
        let elem = Element::new(0, PolyOrders::iso(0));

        let selection = selector
            .select_refinement::<Complex64, _>(&elem, &ComplexConstRef)
            .unwrap();

        // a constant is exactly representable at every admissible order
        assert!(selection.predicted_error_sq < 1e-12);

        // the constant loads the winner's leading (constant) shape
        let leading_coef = selection.coefficients[0].get(0).unwrap().coef;
        assert!(leading_coef.norm() > 0.0);
    }

    #[test]
    fn hcurl_constant_field_projects_exactly() {
        let selector =
            ProjBasedSelector::<HCurlSpace>::with(HCurlSpace, CandList::HpIso, 1.0, None)
                .unwrap();
        let elem = Element::new(0, PolyOrders::iso(1));

        let selection = selector
            .select_refinement::<f64, _>(&elem, &ConstVecRef)
            .unwrap();

        assert!(selection.predicted_error_sq < 1e-12);
        assert!(selection.dof_delta > 0);
    }

    // evaluate a son's projection from its (shape-index, coefficient) pairs at a point
    // in the parent's reference coordinates
    fn eval_coefficients(coefs: &AsmList<f64>, point: [f64; 2]) -> f64 {
        let u_shapes = LegendreShapeFn::with(9, &point[0..1]);
        let v_shapes = LegendreShapeFn::with(9, &point[1..2]);
        coefs
            .iter()
            .map(|entry| {
                entry.coef
                    * u_shapes.poly(entry.idx.i as usize, 0)
                    * v_shapes.poly(entry.idx.j as usize, 0)
            })
            .sum()
    }

    struct ConstRef;

    impl RefSolution<f64> for ConstRef {
        fn sample(&self, _elem_id: usize, _point: V2D) -> Option<RefSample<f64>> {
            Some(RefSample::scalar(2.0, 0.0, 0.0))
        }
    }

    #[test]
    fn coefficients_belong_to_the_raw_shapes_they_name() {
        // the constant 2.0 projects exactly; reconstructing the winner from its
        // coefficient list must reproduce it at any point of the element
        let selector =
            ProjBasedSelector::<L2Space>::with(L2Space, CandList::PIso, 1.0, None).unwrap();
        let elem = Element::new(0, PolyOrders::iso(1));

        let selection = selector.select_refinement::<f64, _>(&elem, &ConstRef).unwrap();
        for point in [[0.0, 0.0], [0.3, -0.7]] {
            let value = eval_coefficients(&selection.coefficients[0], point);
            assert!((value - 2.0).abs() < 1e-10, "reconstructed {}", value);
        }
    }

    #[test]
    fn son_coefficients_reconstruct_the_projection_on_each_sub_domain() {
        // on a quadrant the raw shapes are far from orthogonal, so this exercises the
        // change of basis between the conditioned solve and the returned coefficients
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HIso, 1.0, None).unwrap();
        let elem = Element::new(0, PolyOrders::iso(2));

        let selection = selector.select_refinement::<f64, _>(&elem, &ConstRef).unwrap();
        assert_eq!(selection.candidate.split, Split::T);

        // SW son covers [-1, 0]², NE son covers [0, 1]² in parent coordinates
        let value_sw = eval_coefficients(&selection.coefficients[0], [-0.5, -0.5]);
        assert!((value_sw - 2.0).abs() < 1e-10, "reconstructed {}", value_sw);

        let value_ne = eval_coefficients(&selection.coefficients[3], [0.5, 0.7]);
        assert!((value_ne - 2.0).abs() < 1e-10, "reconstructed {}", value_ne);
    }

    #[test]
    fn missing_reference_data_fails_the_selection() {
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpIso, 1.0, None).unwrap();
        let elem = Element::new(11, PolyOrders::iso(2));

        match selector.select_refinement::<f64, _>(&elem, &PartialRef) {
            Err(SelectionError::MissingRefValues { elem_id, .. }) => assert_eq!(elem_id, 11),
            other => panic!("expected MissingRefValues, got {:?}", other.err()),
        }
    }

    #[test]
    fn element_at_max_order_with_p_only_policy_has_no_viable_candidate() {
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::PIso, 1.0, None).unwrap();
        let elem = Element::new(5, PolyOrders::iso(9));

        match selector.select_refinement::<f64, _>(&elem, &SmoothRef) {
            Err(SelectionError::NoViableCandidate { elem_id }) => assert_eq!(elem_id, 5),
            other => panic!("expected NoViableCandidate, got {:?}", other.err()),
        }
    }

    #[test]
    fn invalid_configurations_are_rejected_up_front() {
        assert_eq!(
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpAniso, 0.0, None)
                .err()
                .unwrap(),
            SelectionError::InvalidConvExp(0.0)
        );

        assert_eq!(
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpAniso, 1.0, None)
                .unwrap()
                .with_glq_points(2)
                .err()
                .unwrap(),
            SelectionError::InvalidGlqSettings(2)
        );
    }

    #[test]
    fn parallel_selection_preserves_element_order_and_results() {
        let selector =
            ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpAniso, 1.0, None).unwrap();

        let elems: Vec<Element> = (0..6)
            .map(|id| Element::new(id, PolyOrders::iso(1 + (id % 3) as u8)))
            .collect();

        let parallel = selector.select_refinements::<f64, _>(&elems, &SmoothRef);

        for (elem, (id, result)) in elems.iter().zip(parallel.iter()) {
            assert_eq!(elem.id, *id);
            let sequential = selector
                .select_refinement::<f64, _>(elem, &SmoothRef)
                .unwrap();
            let parallel_selection = result.as_ref().unwrap();
            assert_eq!(sequential.candidate, parallel_selection.candidate);
            assert_eq!(
                sequential.score.to_bits(),
                parallel_selection.score.to_bits()
            );
        }
    }
}
