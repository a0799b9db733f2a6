use crate::domain::{Element, PolyOrders, Split};
use smallvec::{smallvec, SmallVec};

/// Largest order increase a p-refinement candidate may propose over the current orders
pub const MAX_P_INCREMENT: u8 = 2;

/// Predefined candidate-list policies controlling which refinements are proposed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandList {
    /// p-refinements with equal order increments in both directions
    PIso,
    /// p-refinements with independent directed order increments
    PAniso,
    /// isotropic h-refinement only; sons keep the current orders
    HIso,
    /// isotropic and anisotropic h-refinements; sons keep the current orders
    HAniso,
    /// isotropic hp-refinements
    HpIso,
    /// hp-refinements with anisotropic splits and isotropic orders
    HpAnisoH,
    /// hp-refinements with isotropic splits and anisotropic orders
    HpAnisoP,
    /// the full hp candidate set: anisotropic splits and anisotropic orders
    HpAniso,
}

impl CandList {
    fn does_p(&self) -> bool {
        !matches!(self, Self::HIso | Self::HAniso)
    }

    fn aniso_p(&self) -> bool {
        matches!(self, Self::PAniso | Self::HpAnisoP | Self::HpAniso)
    }

    fn splits(&self) -> &'static [Split] {
        match self {
            Self::PIso | Self::PAniso => &[],
            Self::HIso | Self::HpIso | Self::HpAnisoP => &[Split::T],
            Self::HAniso | Self::HpAnisoH | Self::HpAniso => &[Split::T, Split::U, Split::V],
        }
    }
}

/// A refinement proposal: a split type and the expansion orders assigned to each
/// resulting son. Value object; created by [create_candidates] and consumed, never
/// mutated, by the projection solver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub split: Split,
    pub son_orders: SmallVec<[PolyOrders; 4]>,
}

impl Candidate {
    /// An order-only (un-split) candidate
    pub fn p(orders: PolyOrders) -> Self {
        Self {
            split: Split::P,
            son_orders: smallvec![orders],
        }
    }

    pub fn with_split(split: Split, son_orders: SmallVec<[PolyOrders; 4]>) -> Self {
        debug_assert_eq!(son_orders.len(), split.num_sons());
        Self { split, son_orders }
    }

    /// Sum of all directed orders across sons; used as a deterministic tie-breaker
    pub fn total_order(&self) -> u16 {
        self.son_orders.iter().map(|o| o.total()).sum()
    }

    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> json::JsonValue {
        json::object! {
            "split": format!("{:?}", self.split),
            "son_orders": self
                .son_orders
                .iter()
                .map(|o| format!("{}", o))
                .collect::<Vec<String>>(),
        }
    }
}

/// Enumerate the refinement candidates for an element under a candidate-list policy and
/// an admissible order range.
///
/// The first candidate is always the un-refined element at its current (clamped)
/// orders; it carries no new DOFs and serves as the scoring baseline. If the order
/// range is degenerate (`min_order > max_order`) a single feasible candidate is
/// produced rather than an empty set
pub fn create_candidates(
    elem: &Element,
    cand_list: CandList,
    min_order: u8,
    max_order: u8,
) -> Vec<Candidate> {
    if min_order > max_order {
        return vec![Candidate::p(PolyOrders::iso(min_order))];
    }

    let cur = elem.poly_orders.clamped(min_order, max_order);
    let mut candidates = vec![Candidate::p(cur)];

    if cand_list.does_p() {
        for dj in 0..=MAX_P_INCREMENT {
            for di in 0..=MAX_P_INCREMENT {
                if di == 0 && dj == 0 {
                    continue;
                }
                if !cand_list.aniso_p() && di != dj {
                    continue;
                }
                let (i, j) = (cur.i + di, cur.j + dj);
                if i > max_order || j > max_order {
                    continue;
                }
                push_unique(&mut candidates, Candidate::p(PolyOrders::from(i, j)));
            }
        }
    }

    for &split in cand_list.splits() {
        if cand_list.does_p() {
            // son orders start from the halved parent orders (halved in the split
            // direction only for anisotropic splits) and vary by at most one
            let base = match split {
                Split::T => PolyOrders::from(half(cur.i), half(cur.j)),
                Split::U => PolyOrders::from(half(cur.i), cur.j),
                Split::V => PolyOrders::from(cur.i, half(cur.j)),
                Split::P => unreachable!(),
            }
            .clamped(min_order, max_order);

            let increments: &[(u8, u8)] = if cand_list.aniso_p() {
                &[(0, 0), (1, 0), (0, 1), (1, 1)]
            } else {
                &[(0, 0), (1, 1)]
            };

            let num_sons = split.num_sons();
            for combo in 0..increments.len().pow(num_sons as u32) {
                let mut code = combo;
                let son_orders: SmallVec<[PolyOrders; 4]> = (0..num_sons)
                    .map(|_| {
                        let (di, dj) = increments[code % increments.len()];
                        code /= increments.len();
                        PolyOrders::from(base.i + di, base.j + dj)
                            .clamped(min_order, max_order)
                    })
                    .collect();
                push_unique(&mut candidates, Candidate::with_split(split, son_orders));
            }
        } else {
            let son_orders: SmallVec<[PolyOrders; 4]> =
                (0..split.num_sons()).map(|_| cur).collect();
            push_unique(&mut candidates, Candidate::with_split(split, son_orders));
        }
    }

    candidates
}

fn half(order: u8) -> u8 {
    (order + 1) / 2
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_comes_first_and_carries_current_orders() {
        let elem = Element::new(0, PolyOrders::from(2, 3));

        for cand_list in [
            CandList::PIso,
            CandList::PAniso,
            CandList::HIso,
            CandList::HAniso,
            CandList::HpIso,
            CandList::HpAniso,
        ] {
            let candidates = create_candidates(&elem, cand_list, 1, 9);
            assert_eq!(candidates[0], Candidate::p(PolyOrders::from(2, 3)));
        }
    }

    #[test]
    fn p_only_policies_propose_no_splits() {
        let elem = Element::new(0, PolyOrders::iso(2));

        let iso = create_candidates(&elem, CandList::PIso, 1, 9);
        assert!(iso.iter().all(|c| c.split == Split::P));
        // baseline + increments (1,1) and (2,2)
        assert_eq!(iso.len(), 3);

        let aniso = create_candidates(&elem, CandList::PAniso, 1, 9);
        assert!(aniso.iter().all(|c| c.split == Split::P));
        // baseline + all directed increments up to (2,2)
        assert_eq!(aniso.len(), 9);
    }

    #[test]
    fn h_only_policies_keep_current_orders() {
        let elem = Element::new(0, PolyOrders::from(3, 2));

        let candidates = create_candidates(&elem, CandList::HAniso, 1, 9);
        assert_eq!(candidates.len(), 4); // baseline + T + U + V

        for candidate in candidates.iter().skip(1) {
            assert_eq!(candidate.son_orders.len(), candidate.split.num_sons());
            assert!(candidate
                .son_orders
                .iter()
                .all(|o| *o == PolyOrders::from(3, 2)));
        }
    }

    #[test]
    fn hp_son_orders_start_from_halved_parent_orders() {
        let elem = Element::new(0, PolyOrders::iso(4));
        let candidates = create_candidates(&elem, CandList::HpIso, 1, 9);

        let t_cands: Vec<_> = candidates.iter().filter(|c| c.split == Split::T).collect();
        assert_eq!(t_cands.len(), 16); // 2 increment choices per son, 4 sons

        for candidate in &t_cands {
            for orders in &candidate.son_orders {
                assert!(orders.i == 2 || orders.i == 3);
                assert!(orders.j == 2 || orders.j == 3);
            }
        }
    }

    #[test]
    fn orders_never_exceed_the_admissible_range() {
        let elem = Element::new(0, PolyOrders::iso(8));

        for candidate in create_candidates(&elem, CandList::HpAniso, 1, 8) {
            for orders in &candidate.son_orders {
                assert!(orders.i >= 1 && orders.i <= 8);
                assert!(orders.j >= 1 && orders.j <= 8);
            }
        }
    }

    #[test]
    fn degenerate_order_range_clamps_to_a_single_candidate() {
        let elem = Element::new(0, PolyOrders::iso(5));
        let candidates = create_candidates(&elem, CandList::HpAniso, 2, 1);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0], Candidate::p(PolyOrders::iso(2)));
    }

    #[test]
    fn duplicate_candidates_are_suppressed() {
        // clamping at the top of the range collapses increment combinations
        let elem = Element::new(0, PolyOrders::iso(2));
        let candidates = create_candidates(&elem, CandList::HpIso, 1, 2);

        let mut seen = Vec::new();
        for candidate in &candidates {
            assert!(!seen.contains(candidate));
            seen.push(candidate.clone());
        }
    }
}
