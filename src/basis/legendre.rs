use super::ShapeFn;

/// Legendre-polynomial shape functions, evaluated with the Bonnet three-term recurrence.
/// Mutually orthogonal over (-1.0, +1.0), which keeps the local projection matrices
/// well-conditioned before any explicit orthogonalization is applied
pub struct LegendreShapeFn {
    polys: Vec<Vec<f64>>,
    polys_d1: Vec<Vec<f64>>,
}

impl ShapeFn for LegendreShapeFn {
    fn with(max_order: usize, points: &[f64]) -> Self {
        let num_points = points.len();
        let mut polys: Vec<Vec<f64>> = Vec::with_capacity(max_order + 1);
        let mut polys_d1: Vec<Vec<f64>> = Vec::with_capacity(max_order + 1);

        for n in 0..=max_order {
            match n {
                0 => {
                    polys.push(vec![1.0; num_points]);
                    polys_d1.push(vec![0.0; num_points]);
                }
                1 => {
                    polys.push(points.to_vec());
                    polys_d1.push(vec![1.0; num_points]);
                }
                _ => {
                    let n_ = n as f64;
                    polys.push(
                        points
                            .iter()
                            .enumerate()
                            .map(|(p, x)| {
                                ((2.0 * n_ - 1.0) * x * polys[n - 1][p]
                                    - (n_ - 1.0) * polys[n - 2][p])
                                    / n_
                            })
                            .collect(),
                    );
                    // P'_n = P'_{n-2} + (2n - 1) P_{n-1}
                    polys_d1.push(
                        (0..num_points)
                            .map(|p| polys_d1[n - 2][p] + (2.0 * n_ - 1.0) * polys[n - 1][p])
                            .collect(),
                    );
                }
            }
        }

        Self { polys, polys_d1 }
    }

    fn poly(&self, n: usize, p: usize) -> f64 {
        self.polys[n][p]
    }

    fn poly_d1(&self, n: usize, p: usize) -> f64 {
        self.polys_d1[n][p]
    }
}
