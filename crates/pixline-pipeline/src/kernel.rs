//! Normalized Gaussian smoothing kernel.
//!
//! The kernel is a square `(2r+1) x (2r+1)` matrix of `f64` weights with
//! `w(dx, dy) = exp(-(dx² + dy²) / (2r²))`, scaled so the weights sum to
//! one. The radius doubles as the Gaussian's standard deviation.
//!
//! Radii above [`Kernel::MAX_RADIUS`] are built at that radius.

/// A square, normalized 2D smoothing kernel.
///
/// Weights are stored row-major: index `(ky + r) * side + (kx + r)` holds
/// the weight for offset `(kx, ky)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    radius: u32,
    weights: Vec<f64>,
}

impl Kernel {
    /// Largest radius a kernel is built at.
    pub const MAX_RADIUS: u32 = 32;

    /// The single-weight identity kernel (`radius = 0`).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            radius: 0,
            weights: vec![1.0],
        }
    }

    /// Build the normalized Gaussian kernel for `radius`.
    ///
    /// `radius = 0` yields [`Kernel::identity`]; the general formula would
    /// divide by zero. A radius above [`Kernel::MAX_RADIUS`] is lowered to
    /// it with a warning.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn gaussian(radius: u32) -> Self {
        if radius > Self::MAX_RADIUS {
            log::warn!(
                "blur radius {radius} exceeds {}, smoothing at {}",
                Self::MAX_RADIUS,
                Self::MAX_RADIUS,
            );
        }
        let radius = Self::effective_radius(radius);
        if radius == 0 {
            return Self::identity();
        }

        let r = i64::from(radius);
        let two_sigma_sq = 2.0 * f64::from(radius) * f64::from(radius);

        let raw: Vec<f64> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx * dx + dy * dy) as f64))
            .map(|dist_sq| (-dist_sq / two_sigma_sq).exp())
            .collect();
        let sum: f64 = raw.iter().sum();

        Self {
            radius,
            weights: raw.into_iter().map(|w| w / sum).collect(),
        }
    }

    /// The radius [`Kernel::gaussian`] actually builds for `radius`.
    #[must_use]
    pub const fn effective_radius(radius: u32) -> u32 {
        if radius > Self::MAX_RADIUS {
            Self::MAX_RADIUS
        } else {
            radius
        }
    }

    /// Kernel radius `r`.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Side length `2r + 1` (always odd).
    #[must_use]
    pub const fn side(&self) -> usize {
        2 * self.radius as usize + 1
    }

    /// All weights, row-major.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight at offset `(kx, ky)`, each in `[-r, r]`.
    ///
    /// Returns `None` for offsets outside the kernel.
    #[must_use]
    pub fn weight(&self, kx: i64, ky: i64) -> Option<f64> {
        let r = i64::from(self.radius);
        if kx.abs() > r || ky.abs() > r {
            return None;
        }
        let side = 2 * r + 1;
        let index = usize::try_from((ky + r) * side + (kx + r)).ok()?;
        self.weights.get(index).copied()
    }

    /// Sum of all weights (one, within rounding).
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::identity()
    }
}
