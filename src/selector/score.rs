use super::asm_list::AsmList;
use super::candidates::Candidate;
use super::projection::CandidateResult;
use super::SelectionError;
use smallvec::SmallVec;

/// The winning refinement candidate, its predicted squared projection error, the number
/// of DOFs it adds, and the projection coefficients of the reference solution in its
/// approximation space. Each coefficient belongs to the raw shape function named by its
/// entry's shape index (DOF numbering local to the candidate); summing
/// `coef * shape(point)` over a son's entries reconstructs the projected solution there
#[derive(Clone, Debug)]
pub struct Selection<S> {
    pub candidate: Candidate,
    pub predicted_error_sq: f64,
    pub dof_delta: usize,
    pub score: f64,
    pub degraded: bool,
    pub coefficients: SmallVec<[AsmList<S>; 4]>,
}

#[cfg(feature = "json_export")]
impl<S> Selection<S> {
    /// Produce a Json object describing this Selection
    pub fn to_json(&self) -> json::JsonValue {
        json::object! {
            "candidate": self.candidate.to_json(),
            "predicted_error_sq": self.predicted_error_sq,
            "dof_delta": self.dof_delta,
            "score": self.score,
            "degraded": self.degraded,
        }
    }
}

/// Convert candidate results into scores and pick the winner.
///
/// `score = (error_before − error_candidate) / ΔDOF^conv_exp`, where `error_before` is
/// the baseline (un-refined) candidate's projection error. Candidates which add no DOFs
/// are excluded. Ties are broken deterministically: non-degraded candidates first, then
/// the lower split rank, then the lower total order, then generation order
pub(crate) fn select_best<S>(
    mut results: Vec<CandidateResult<S>>,
    current_dofs: usize,
    conv_exp: f64,
    elem_id: usize,
) -> Result<Selection<S>, SelectionError> {
    // the generator always emits the un-refined candidate first
    let error_before = results[0].error_sq;

    let mut best: Option<(usize, f64, (bool, usize, u16))> = None;
    for (position, result) in results.iter().enumerate() {
        if result.dofs <= current_dofs {
            continue;
        }

        let dof_delta = (result.dofs - current_dofs) as f64;
        let score = (error_before - result.error_sq) / dof_delta.powf(conv_exp);
        let tie_key = (
            result.degraded,
            result.candidate.split.rank(),
            result.candidate.total_order(),
        );

        let better = match &best {
            Some((_, best_score, best_key)) => {
                score > *best_score || (score == *best_score && tie_key < *best_key)
            }
            None => true,
        };
        if better {
            best = Some((position, score, tie_key));
        }
    }

    let (position, score, _) = best.ok_or(SelectionError::NoViableCandidate { elem_id })?;
    let result = results.swap_remove(position);

    Ok(Selection {
        candidate: result.candidate,
        predicted_error_sq: result.error_sq,
        dof_delta: result.dofs - current_dofs,
        score,
        degraded: result.degraded,
        coefficients: result.coefs,
    })
}
