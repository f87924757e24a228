pub use nalgebra::{DMatrix, DVector};
pub use rand::Rng;
pub use rand_distr::StandardNormal;

use crate::traits::*;

impl SampleOps for DMatrix<f64> {
    type Mat = Self;
    type Scalar = f64;

    fn runif<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::from_fn(dd, nn, |_, _| rng.random::<f64>())
    }

    fn rnorm<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::from_fn(dd, nn, |_, _| rng.sample::<f64, _>(StandardNormal))
    }
}

impl SpectralOps for DMatrix<f64> {
    type Scalar = f64;
    type DVec = DVector<f64>;

    fn sorted_symmetric_eigenvalues(&self) -> Self::DVec {
        if self.is_empty() || !self.is_square() {
            return DVector::zeros(0);
        }
        let mut eigs = self.symmetric_eigenvalues();
        eigs.as_mut_slice().sort_by(|a, b| a.total_cmp(b));
        eigs
    }

    fn min_eigenvalue(&self) -> Self::Scalar {
        self.sorted_symmetric_eigenvalues()
            .iter()
            .copied()
            .next()
            .unwrap_or(f64::NAN)
    }

    fn is_pos_def(&self, tol: Self::Scalar) -> bool {
        if !self.is_square() || self.iter().any(|x| !x.is_finite()) {
            return false;
        }
        self.sorted_symmetric_eigenvalues()
            .iter()
            .all(|&e| e.abs() >= tol && e > 0.0)
    }

    fn is_pos_semidef(&self, tol: Self::Scalar) -> bool {
        if !self.is_square() || self.iter().any(|x| !x.is_finite()) {
            return false;
        }
        self.sorted_symmetric_eigenvalues()
            .iter()
            .all(|&e| e.abs() < tol || e >= 0.0)
    }

    fn numerical_rank(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let sv = self.singular_values();
        let smax = sv.max();
        if smax <= 0.0 || !smax.is_finite() {
            return 0;
        }
        let tol = smax * (self.nrows().max(self.ncols()) as f64) * f64::EPSILON;
        sv.iter().filter(|&&s| s > tol).count()
    }
}

impl SparsityOps for DMatrix<f64> {
    type Scalar = f64;

    fn offdiag_degree(&self, row: usize) -> usize {
        self.row(row)
            .iter()
            .enumerate()
            .filter(|&(j, &x)| j != row && x != 0.0)
            .count()
    }

    fn offdiag_degrees(&self) -> Vec<usize> {
        (0..self.nrows()).map(|i| self.offdiag_degree(i)).collect()
    }

    fn offdiag_support(&self, row: usize) -> Vec<usize> {
        self.row(row)
            .iter()
            .enumerate()
            .filter_map(|(j, &x)| (j != row && x != 0.0).then_some(j))
            .collect()
    }

    fn zero_below_inplace(&mut self, threshold: Self::Scalar) {
        self.iter_mut().for_each(|x| {
            if x.abs() < threshold {
                *x = 0.0;
            }
        });
    }

    fn is_symmetric(&self, tol: Self::Scalar) -> bool {
        if !self.is_square() {
            return false;
        }
        let nn = self.nrows();
        (0..nn).all(|i| ((i + 1)..nn).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= tol))
    }

    fn mirror_upper_inplace(&mut self) {
        let nn = self.nrows().min(self.ncols());
        for i in 0..nn {
            for j in (i + 1)..nn {
                self[(j, i)] = self[(i, j)];
            }
        }
    }
}

impl MatOps for DMatrix<f64> {
    type Mat = Self;
    type Scalar = f64;

    fn normalize_rows_by_sum_inplace(&mut self) -> anyhow::Result<()> {
        for mut x_i in self.row_iter_mut() {
            let denom = x_i.sum();
            if denom == 0.0 || !denom.is_finite() {
                anyhow::bail!("cannot normalize a row summing to {}", denom);
            }
            x_i /= denom;
        }
        Ok(())
    }

    fn unit_diagonal_inplace(&mut self) -> anyhow::Result<()> {
        if !self.is_square() {
            anyhow::bail!("expected a square matrix, got {:?}", self.shape());
        }
        let d = self.diagonal();
        if let Some(bad) = d.iter().find(|&&x| !(x > 0.0)) {
            anyhow::bail!("non-positive diagonal element {}", bad);
        }
        let d = d.map(|x| 1.0 / x.sqrt());
        let nn = self.nrows();
        for j in 0..nn {
            for i in 0..nn {
                self[(i, j)] *= d[i] * d[j];
            }
        }
        Ok(())
    }

    fn scale_to_norm_inplace(&mut self, target: Self::Scalar) {
        let nrm = self.norm();
        if nrm > 0.0 {
            *self *= target / nrm;
        }
    }

    fn symmetrize(&self) -> Self::Mat {
        (self + self.transpose()) * 0.5
    }
}
