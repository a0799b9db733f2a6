//! Projection-based hp-refinement candidate selection for 2D Finite Element solvers.
//!
//! Given an element flagged for refinement and a reference solution computed on a finer
//! discretization, the selector enumerates the admissible refinement candidates
//! (p-enrichments, isotropic and anisotropic h-splits, and hp combinations), projects
//! the reference solution onto each candidate's approximation space, and returns the
//! candidate with the best projection-error reduction per added degree of freedom.
//!
//! ```rust
//! use hp_select_2d::{
//!     CandList, Element, H1Space, PolyOrders, ProjBasedSelector, RefSample, RefSolution,
//!     SelectionError, V2D,
//! };
//!
//! // the reference solution is sampled in the flagged element's parametric coordinates
//! struct MyRefSolution;
//!
//! impl RefSolution<f64> for MyRefSolution {
//!     fn sample(&self, _elem_id: usize, point: V2D) -> Option<RefSample<f64>> {
//!         let (u, v) = (point[0], point[1]);
//!         Some(RefSample::scalar(u * u * v, 2.0 * u * v, u * u))
//!     }
//! }
//!
//! let selector = ProjBasedSelector::<H1Space>::with(H1Space, CandList::HpAniso, 1.0, None)?;
//!
//! let elem = Element::new(0, PolyOrders::iso(1));
//! let selection = selector.select_refinement::<f64, _>(&elem, &MyRefSolution)?;
//!
//! println!(
//!     "Elem 0: {:?} split adding {} DOFs (score: {:.3e})",
//!     selection.candidate.split, selection.dof_delta, selection.score,
//! );
//! # Ok::<(), SelectionError>(())
//! ```

pub mod basis;
pub mod domain;
pub mod selector;

pub use basis::{LegendreShapeFn, ShapeFn};
pub use domain::{Element, PolyOrders, Split, V2D};
pub use selector::{
    CandList, Candidate, H1Space, HCurlSpace, HDivSpace, L2Space, ProjBasedSelector, ProjSpace,
    RefSample, RefSolution, Selection, SelectionError,
};
