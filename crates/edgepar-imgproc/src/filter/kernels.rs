use crate::error::FilterError;

/// Horizontal 3x3 gradient kernel, row-major.
pub const SOBEL_KERNEL_X: [[i32; 3]; 3] = [[1, 0, -1], [2, 0, -2], [1, 0, -1]];

/// Vertical 3x3 gradient kernel, row-major.
pub const SOBEL_KERNEL_Y: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Magnitudes strictly below this value are forced to zero by the Sobel filter.
pub const SOBEL_WEAK_GRADIENT_THRESHOLD: u8 = 50;

/// Horizontal and vertical derivative of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gradient {
    /// Response to [`SOBEL_KERNEL_X`].
    pub grad_x: i32,
    /// Response to [`SOBEL_KERNEL_Y`].
    pub grad_y: i32,
}

impl Gradient {
    /// Euclidean norm rounded to the nearest integer and clamped to `[0, 255]`.
    pub fn magnitude(&self) -> u8 {
        let gx = self.grad_x as f64;
        let gy = self.grad_y as f64;
        (gx * gx + gy * gy).sqrt().round().clamp(0.0, 255.0) as u8
    }

    /// Direction of the gradient in radians, `atan2(grad_y, grad_x)`.
    pub fn angle(&self) -> f64 {
        (self.grad_y as f64).atan2(self.grad_x as f64)
    }
}

/// Apply both gradient kernels to a 3x3 neighborhood given in row-major order.
///
/// # Examples
///
/// ```
/// use edgepar_imgproc::filter::kernels::gradient;
///
/// // dark left column, bright right column
/// let g = gradient(&[0, 0, 255, 0, 0, 255, 0, 0, 255]);
/// assert_eq!(g.grad_x, -1020);
/// assert_eq!(g.grad_y, 0);
/// ```
pub fn gradient(neighborhood: &[u8; 9]) -> Gradient {
    let mut grad_x = 0;
    let mut grad_y = 0;
    for (k, &px) in neighborhood.iter().enumerate() {
        let (ky, kx) = (k / 3, k % 3);
        grad_x += SOBEL_KERNEL_X[ky][kx] * px as i32;
        grad_y += SOBEL_KERNEL_Y[ky][kx] * px as i32;
    }
    Gradient { grad_x, grad_y }
}

/// Gradient magnitude with the weak-gradient suppression applied.
pub fn thresholded_magnitude(gradient: &Gradient) -> u8 {
    match gradient.magnitude() {
        m if m < SOBEL_WEAK_GRADIENT_THRESHOLD => 0,
        m => m,
    }
}

/// A square smoothing kernel with coefficients summing to one.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    size: usize,
    data: Vec<f64>,
}

impl GaussianKernel {
    /// Create a gaussian kernel.
    ///
    /// # Arguments
    ///
    /// * `size` - The side length of the kernel. Must be odd.
    /// * `sigma` - The standard deviation. Must be finite and positive.
    ///
    /// # Examples
    ///
    /// ```
    /// use edgepar_imgproc::filter::kernels::GaussianKernel;
    ///
    /// let kernel = GaussianKernel::new(5, 1.4).unwrap();
    /// let sum: f64 = kernel.as_slice().iter().sum();
    /// assert!((sum - 1.0).abs() < 1e-12);
    /// ```
    pub fn new(size: usize, sigma: f64) -> Result<Self, FilterError> {
        if size == 0 || size % 2 == 0 {
            return Err(FilterError::InvalidKernelSize(size));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(FilterError::InvalidSigma(sigma));
        }

        let half = (size / 2) as f64;
        let two_sigma_sq = 2.0 * sigma * sigma;

        // compute the kernel
        let mut data = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let y = row as f64 - half;
                let x = col as f64 - half;
                data.push((-(x * x + y * y) / two_sigma_sq).exp());
            }
        }

        // normalize the kernel
        let norm = data.iter().sum::<f64>();
        data.iter_mut().for_each(|k| *k /= norm);

        Ok(Self { size, data })
    }

    /// Side length of the kernel.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of pixels on each side of the center, `size / 2`.
    pub fn radius(&self) -> usize {
        self.size / 2
    }

    /// Coefficients in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Coefficient at `(row, col)` of the kernel.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.data.get(row * self.size + col).copied()
    }
}
