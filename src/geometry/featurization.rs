// file: src/geometry/featurization.rs
// description: matrix to feature vector transforms (upper triangle and tangent space)
// reference: Barachant et al. (2012) tangent space mapping

use super::linalg::{expm, inv_sqrtm, logm, sqrtm, symmetrize};
use super::{Matrix, RowVector};
use crate::error::{GeometryError, Result};
use std::f64::consts::SQRT_2;

/// Upper triangle as a row, either row by row or diagonal by diagonal.
pub fn squeeze_upper_triangle(m: &Matrix, row_major: bool) -> Result<RowVector> {
    if m.is_empty() || !m.is_square() {
        return Err(GeometryError::not_square("upper triangle", m.nrows(), m.ncols()));
    }
    let n = m.nrows();
    let mut out = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for j in i..n {
            out.push(if row_major { m[(i, j)] } else { m[(j, j - i)] });
        }
    }
    Ok(RowVector::from_vec(out))
}

fn triangle_side(len: usize) -> Result<usize> {
    let n = (((1 + 8 * len) as f64).sqrt() as usize - 1) / 2;
    if n == 0 || n * (n + 1) / 2 != len {
        return Err(GeometryError::InvalidInput(format!(
            "{} values do not form an upper triangle",
            len
        )));
    }
    Ok(n)
}

/// Symmetric matrix rebuilt from its squeezed upper triangle.
pub fn unsqueeze_upper_triangle(v: &RowVector, row_major: bool) -> Result<Matrix> {
    let n = triangle_side(v.len())?;
    let mut out = Matrix::zeros(n, n);
    let mut idx = 0;
    for i in 0..n {
        for j in i..n {
            let (r, c) = if row_major { (i, j) } else { (j - i, j) };
            out[(r, c)] = v[idx];
            out[(c, r)] = v[idx];
            idx += 1;
        }
    }
    Ok(out)
}

/// `upper(log(R^{-1/2} M R^{-1/2}))` with off-diagonal terms weighted by sqrt(2).
pub fn tangent_space(m: &Matrix, reference: Option<&Matrix>) -> Result<RowVector> {
    if m.is_empty() || !m.is_square() {
        return Err(GeometryError::not_square("tangent space", m.nrows(), m.ncols()));
    }
    let n = m.nrows();
    let j = match reference {
        Some(r) if !r.is_empty() => {
            if r.shape() != m.shape() {
                return Err(GeometryError::size_mismatch("tangent space reference", m.shape(), r.shape()));
            }
            let isr = inv_sqrtm(r)?;
            logm(&symmetrize(&(&isr * m * &isr)))?
        }
        _ => logm(m)?,
    };

    let mut out = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for k in i..n {
            let coeff = if i == k { 1.0 } else { SQRT_2 };
            out.push(coeff * j[(i, k)]);
        }
    }
    Ok(RowVector::from_vec(out))
}

/// Inverse of [`tangent_space`].
pub fn untangent_space(v: &RowVector, reference: Option<&Matrix>) -> Result<Matrix> {
    let mut j = unsqueeze_upper_triangle(v, true)?;
    let n = j.nrows();
    for i in 0..n {
        for k in 0..n {
            if i != k {
                j[(i, k)] /= SQRT_2;
            }
        }
    }
    let e = expm(&j)?;
    match reference {
        Some(r) if !r.is_empty() => {
            if r.shape() != (n, n) {
                return Err(GeometryError::size_mismatch("tangent space reference", (n, n), r.shape()));
            }
            let sr = sqrtm(r)?;
            Ok(symmetrize(&(&sr * e * &sr)))
        }
        _ => Ok(e),
    }
}

/// One tangent vector per matrix, stacked as the rows of a feature matrix.
pub fn tangent_space_rows(matrices: &[Matrix], reference: Option<&Matrix>) -> Result<Matrix> {
    if matrices.is_empty() {
        return Err(GeometryError::empty("tangent space rows"));
    }
    let rows = matrices
        .iter()
        .map(|m| tangent_space(m, reference))
        .collect::<Result<Vec<_>>>()?;
    let width = rows[0].len();
    if let Some(other) = rows.iter().find(|r| r.len() != width) {
        return Err(GeometryError::size_mismatch(
            "tangent space rows",
            (1, width),
            (1, other.len()),
        ));
    }
    Ok(Matrix::from_rows(&rows))
}

pub fn featurize(m: &Matrix, tangent: bool, reference: Option<&Matrix>) -> Result<RowVector> {
    if tangent {
        tangent_space(m, reference)
    } else {
        squeeze_upper_triangle(m, true)
    }
}

pub fn unfeaturize(v: &RowVector, tangent: bool, reference: Option<&Matrix>) -> Result<Matrix> {
    if tangent {
        untangent_space(v, reference)
    } else {
        unsqueeze_upper_triangle(v, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::are_equals;
    use crate::test_support::random_spd;
    use pretty_assertions::assert_eq;

    fn sample() -> Matrix {
        Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0])
    }

    #[test]
    fn test_squeeze_orders() {
        let m = sample();
        let row = squeeze_upper_triangle(&m, true).unwrap();
        assert_eq!(row.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let diagonal = squeeze_upper_triangle(&m, false).unwrap();
        assert_eq!(diagonal.as_slice(), &[1.0, 4.0, 6.0, 2.0, 5.0, 3.0]);
    }

    #[test]
    fn test_unsqueeze_restores_symmetric_matrix() {
        let m = sample();
        for row_major in [true, false] {
            let v = squeeze_upper_triangle(&m, row_major).unwrap();
            assert_eq!(unsqueeze_upper_triangle(&v, row_major).unwrap(), m);
        }
        assert!(unsqueeze_upper_triangle(&RowVector::zeros(4), true).is_err());
        assert!(unsqueeze_upper_triangle(&RowVector::zeros(0), true).is_err());
    }

    #[test]
    fn test_tangent_space_at_reference_is_zero() {
        let r = random_spd(3, 8);
        let v = tangent_space(&r, Some(&r)).unwrap();
        assert!(v.norm() < 1e-10);
    }

    #[test]
    fn test_tangent_norm_matches_riemann_distance() {
        let r = random_spd(3, 1);
        let m = random_spd(3, 2);
        let v = tangent_space(&m, Some(&r)).unwrap();
        let d = crate::geometry::distance(&m, &r, crate::geometry::Metric::Riemann).unwrap();
        assert!((v.norm() - d).abs() < 1e-8);
    }

    #[test]
    fn test_untangent_inverts_tangent() {
        let r = random_spd(4, 5);
        let m = random_spd(4, 6);
        let v = featurize(&m, true, Some(&r)).unwrap();
        let back = unfeaturize(&v, true, Some(&r)).unwrap();
        assert!(are_equals(&back, &m, 1e-8));

        let plain = featurize(&m, false, None).unwrap();
        assert_eq!(unfeaturize(&plain, false, None).unwrap(), m);
    }

    #[test]
    fn test_tangent_space_rows() {
        let set = [random_spd(3, 21), random_spd(3, 22)];
        let features = tangent_space_rows(&set, None).unwrap();
        assert_eq!(features.shape(), (2, 6));
        assert_eq!(features.row(1).clone_owned(), tangent_space(&set[1], None).unwrap());

        assert!(tangent_space_rows(&[], None).is_err());
        assert!(tangent_space_rows(&[random_spd(3, 23), random_spd(2, 24)], None).is_err());
    }
}
