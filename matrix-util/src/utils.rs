use rand::seq::index;
use rand::Rng;

/// Pick `amount` distinct elements of `pool` uniformly at random. If
/// the pool is smaller than `amount`, every element is returned (in
/// random order).
/// * `pool` - candidate elements
/// * `amount` - number of elements to draw
pub fn sample_distinct<R, T>(rng: &mut R, pool: &[T], amount: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    T: Copy,
{
    let amount = amount.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}

/// A uniformly random ordered pair `(r, c)` with `r != c`, both in `0..nn`
/// * `nn` - dimension (must be at least 2)
pub fn random_offdiag_pair<R>(rng: &mut R, nn: usize) -> (usize, usize)
where
    R: Rng + ?Sized,
{
    debug_assert!(nn > 1);
    let r = rng.random_range(0..nn);
    let mut c = rng.random_range(0..(nn - 1));
    if c >= r {
        c += 1;
    }
    (r, c)
}

/// Draw `amount` off-diagonal positions whose unordered pairs are all
/// distinct. `amount` is capped at `nn * (nn - 1) / 2`.
pub fn random_offdiag_pairs<R>(rng: &mut R, nn: usize, amount: usize) -> Vec<(usize, usize)>
where
    R: Rng + ?Sized,
{
    let npairs = nn * nn.saturating_sub(1) / 2;
    let amount = amount.min(npairs);
    let mut ret: Vec<(usize, usize)> = Vec::with_capacity(amount);
    while ret.len() < amount {
        let (r, c) = random_offdiag_pair(rng, nn);
        if !ret
            .iter()
            .any(|&(a, b)| (a == r && b == c) || (a == c && b == r))
        {
            ret.push((r, c));
        }
    }
    ret
}
