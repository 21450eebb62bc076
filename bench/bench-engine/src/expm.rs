//! Matrix exponential with a bounded multiplication budget.
//!
//! Scaling and squaring around a truncated Taylor series. Each Taylor term
//! past the linear one and each squaring costs one matrix multiplication; the
//! budget caps their sum, trading accuracy for cost the way the exponential
//! integrator's truncation order does.

use nalgebra::DMatrix;

/// Taylor terms used when the budget allows.
const TAYLOR_ORDER: u32 = 12;

/// Scaled matrices are brought below this 1-norm before the series.
const SCALED_NORM: f64 = 0.5;

/// Balancing sweeps before giving up on convergence.
const MAX_BALANCE_SWEEPS: usize = 32;

/// Result of one exponential evaluation.
#[derive(Debug, Clone)]
pub struct ExpmResult {
    /// `exp(A)`.
    pub value: DMatrix<f64>,
    /// Matrix multiplications spent.
    pub multiplications: u32,
    /// 1-norm of `A` (before balancing).
    pub norm: f64,
}

/// Matrix exponential evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixExponential {
    max_multiplications: Option<u32>,
    balancing: bool,
}

impl Default for MatrixExponential {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl MatrixExponential {
    /// Create an evaluator with an optional multiplication budget.
    #[must_use]
    pub const fn new(max_multiplications: Option<u32>, balancing: bool) -> Self {
        Self {
            max_multiplications,
            balancing,
        }
    }

    /// Compute `exp(a)`.
    #[must_use]
    pub fn compute(&self, a: &DMatrix<f64>) -> ExpmResult {
        let n = a.nrows();
        let norm = one_norm(a);
        if a.iter().any(|x| !x.is_finite()) {
            return ExpmResult {
                value: DMatrix::from_element(n, n, f64::NAN),
                multiplications: 0,
                norm,
            };
        }

        let (x, scale) = if self.balancing {
            let (b, d) = balance(a);
            (b, Some(d))
        } else {
            (a.clone(), None)
        };

        let x_norm = one_norm(&x);
        let mut squarings = if x_norm > SCALED_NORM {
            // Saturating float-to-int cast; norms here are far below u32::MAX powers of two
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let s = (x_norm / SCALED_NORM).log2().ceil() as u32;
            s
        } else {
            0
        };
        let mut order = TAYLOR_ORDER;
        if let Some(budget) = self.max_multiplications {
            squarings = squarings.min(budget);
            order = order.min((budget - squarings).saturating_add(1));
        }

        let x = x / 2f64.powi(i32::try_from(squarings).unwrap_or(i32::MAX));
        let mut value = DMatrix::<f64>::identity(n, n);
        let mut multiplications = 0;
        if order >= 1 {
            value += &x;
            let mut term = x.clone();
            for k in 2..=order {
                term = (&term * &x) / f64::from(k);
                value += &term;
                multiplications += 1;
            }
        }
        for _ in 0..squarings {
            value = &value * &value;
            multiplications += 1;
        }

        if let Some(d) = scale {
            for i in 0..n {
                for j in 0..n {
                    value[(i, j)] *= d[i] / d[j];
                }
            }
        }

        ExpmResult {
            value,
            multiplications,
            norm,
        }
    }
}

/// Maximum absolute column sum.
#[must_use]
pub fn one_norm(a: &DMatrix<f64>) -> f64 {
    a.column_iter()
        .map(|col| col.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Radix-2 diagonal balancing: returns `B = D⁻¹ A D` and the diagonal of `D`.
fn balance(a: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>) {
    let n = a.nrows();
    let mut b = a.clone();
    let mut d = vec![1.0; n];

    for _ in 0..MAX_BALANCE_SWEEPS {
        let mut converged = true;
        for i in 0..n {
            let mut c = 0.0;
            let mut r = 0.0;
            for j in 0..n {
                if j != i {
                    c += b[(j, i)].abs();
                    r += b[(i, j)].abs();
                }
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }
            let s = c + r;
            let mut f = 1.0;
            while c < r / 2.0 {
                c *= 2.0;
                r /= 2.0;
                f *= 2.0;
            }
            while c >= r * 2.0 {
                c /= 2.0;
                r *= 2.0;
                f /= 2.0;
            }
            if c + r < 0.95 * s {
                converged = false;
                d[i] *= f;
                for j in 0..n {
                    b[(i, j)] /= f;
                    b[(j, i)] *= f;
                }
            }
        }
        if converged {
            break;
        }
    }
    (b, d)
}
