//! Small dense linear algebra helpers on top of `nalgebra`.
use crate::dual::Dual64;
use crate::errors::{EosError, EosResult};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2};

/// Euclidean norm of a vector.
pub(crate) fn norm(x: &Array1<f64>) -> f64 {
    x.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Solve the linear system `a x = b` using an LU decomposition.
pub(crate) fn solve(a: &Array2<f64>, b: &Array1<f64>) -> EosResult<Array1<f64>> {
    let (rows, cols) = a.dim();
    let m = DMatrix::from_fn(rows, cols, |i, j| a[[i, j]]);
    let rhs = DVector::from_iterator(b.len(), b.iter().copied());
    m.lu()
        .solve(&rhs)
        .map(|x| Array1::from_iter(x.iter().copied()))
        .ok_or_else(|| EosError::LinAlgError(String::from("singular matrix")))
}

/// Smallest eigenvalue of a symmetric matrix.
pub(crate) fn smallest_eigenvalue(m: &Array2<f64>) -> f64 {
    let n = m.nrows();
    SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| m[[i, j]]))
        .eigenvalues
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

/// Smallest eigenvalue and the corresponding normalized eigenvector of a
/// symmetric matrix of dual numbers.
///
/// The derivatives of the eigenpair are obtained from first order
/// perturbation theory and require the smallest eigenvalue to be simple.
pub(crate) fn smallest_ev(m: &Array2<Dual64>) -> EosResult<(Dual64, Array1<Dual64>)> {
    let n = m.nrows();
    let re = DMatrix::from_fn(n, n, |i, j| m[[i, j]].re);
    let eps = DMatrix::from_fn(n, n, |i, j| m[[i, j]].eps);
    let eigen = SymmetricEigen::new(re);
    let k = eigen
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(k, _)| k)
        .ok_or_else(|| EosError::LinAlgError(String::from("empty matrix")))?;
    let lambda = eigen.eigenvalues[k];
    let u = eigen.eigenvectors.column(k);

    let d_lambda = (u.transpose() * &eps * u)[(0, 0)];
    let mut du = DVector::zeros(n);
    for j in (0..n).filter(|&j| j != k) {
        let gap = lambda - eigen.eigenvalues[j];
        if gap == 0.0 {
            return Err(EosError::LinAlgError(String::from(
                "degenerate smallest eigenvalue",
            )));
        }
        let uj = eigen.eigenvectors.column(j);
        du += uj * ((uj.transpose() * &eps * u)[(0, 0)] / gap);
    }
    let evec = Array1::from_shape_fn(n, |i| Dual64::new(u[i], du[i]));
    Ok((Dual64::new(lambda, d_lambda), evec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_solve() -> EosResult<()> {
        let a = arr2(&[[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]]);
        let x = arr1(&[1.0, -2.0, 0.5]);
        let b = a.dot(&x);
        assert_relative_eq!(solve(&a, &b)?, x, max_relative = 1e-12);
        assert!(solve(&arr2(&[[1.0, 2.0], [2.0, 4.0]]), &arr1(&[1.0, 1.0])).is_err());
        Ok(())
    }

    #[test]
    fn test_smallest_eigenvalue() {
        let m = arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        assert_relative_eq!(smallest_eigenvalue(&m), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_smallest_ev() -> EosResult<()> {
        // m(x) = [[2 + x, 1], [1, 3 - x]] at x = 0.5
        let f = |x: Dual64| {
            arr2(&[
                [x + 2.0, Dual64::from(1.0)],
                [Dual64::from(1.0), -x + 3.0],
            ])
        };
        let x = Dual64::from(0.5).derivative();
        let (l, u) = smallest_ev(&f(x))?;

        let h = 1e-7;
        let (l1, u1) = smallest_ev(&f(Dual64::from(0.5 + h)))?;
        let (l0, u0) = smallest_ev(&f(Dual64::from(0.5 - h)))?;
        assert_relative_eq!(l.re, 1.5, max_relative = 1e-12);
        assert_relative_eq!(l.eps, (l1.re - l0.re) / (2.0 * h), epsilon = 1e-6);

        // eigenvectors are only defined up to their sign
        let sign = if u[0].re * u1[0].re > 0.0 { 1.0 } else { -1.0 };
        let sign0 = if u[0].re * u0[0].re > 0.0 { 1.0 } else { -1.0 };
        for i in 0..2 {
            let fd = (sign * u1[i].re - sign0 * u0[i].re) / (2.0 * h);
            assert_relative_eq!(u[i].eps, fd, epsilon = 1e-6);
        }
        Ok(())
    }
}
