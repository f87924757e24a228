use rand::Rng;

/// Operations to sample random matrices from an injected random
/// source, so that every draw is reproducible from a seed
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;
}

/// Eigenvalue and rank checks on (symmetric) matrices
pub trait SpectralOps {
    type Scalar;
    type DVec;

    /// Eigenvalues of a symmetric matrix in ascending order
    fn sorted_symmetric_eigenvalues(&self) -> Self::DVec;

    /// The smallest eigenvalue of a symmetric matrix
    fn min_eigenvalue(&self) -> Self::Scalar;

    /// Positive definite: eigenvalues with `|λ| < tol` are taken as
    /// zero, and all the rest must be strictly positive
    fn is_pos_def(&self, tol: Self::Scalar) -> bool;

    /// Positive semi-definite: eigenvalues with `|λ| < tol` are taken
    /// as zero, and none may be negative
    fn is_pos_semidef(&self, tol: Self::Scalar) -> bool;

    /// Number of singular values above `σ_max * max(m, n) * ε`
    fn numerical_rank(&self) -> usize;
}

/// Sparsity pattern of a square matrix (exact zeros)
pub trait SparsityOps {
    type Scalar;

    /// Number of nonzero off-diagonal entries in `row`
    fn offdiag_degree(&self, row: usize) -> usize;

    fn offdiag_degrees(&self) -> Vec<usize>;

    fn max_offdiag_degree(&self) -> usize {
        self.offdiag_degrees().into_iter().max().unwrap_or(0)
    }

    /// Column indices `j != row` where `x[row, j] != 0`
    fn offdiag_support(&self, row: usize) -> Vec<usize>;

    /// `x[i,j] = 0` wherever `|x[i,j]| < threshold`
    fn zero_below_inplace(&mut self, threshold: Self::Scalar);

    fn is_symmetric(&self, tol: Self::Scalar) -> bool;

    /// `x[j,i] = x[i,j]` for all `i < j`
    fn mirror_upper_inplace(&mut self);
}

/// Normalize or scale
pub trait MatOps {
    type Mat;
    type Scalar;

    /// `x[i,] /= sum(x[i,])`
    fn normalize_rows_by_sum_inplace(&mut self) -> anyhow::Result<()>;

    /// `x[i,j] /= sqrt(x[i,i] * x[j,j])`, e.g. covariance to correlation
    fn unit_diagonal_inplace(&mut self) -> anyhow::Result<()>;

    /// Rescale so that the Frobenius norm equals `target`. A zero
    /// matrix is left as is.
    fn scale_to_norm_inplace(&mut self, target: Self::Scalar);

    /// `(x + x') / 2`
    fn symmetrize(&self) -> Self::Mat;
}
