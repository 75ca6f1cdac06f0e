// file: src/utils/validation.rs
// description: matrix shape predicates and input validation helpers
// reference: input validation patterns

use crate::error::{GeometryError, Result};
use crate::geometry::Matrix;
use std::path::Path;

pub struct Validator;

impl Validator {
    /// Closed interval check.
    pub fn in_range(value: f64, min: f64, max: f64) -> bool {
        min <= value && value <= max
    }

    pub fn is_not_empty(m: &Matrix) -> bool {
        m.nrows() != 0 && m.ncols() != 0
    }

    pub fn are_not_empty(matrices: &[Matrix]) -> bool {
        !matrices.is_empty() && matrices.iter().all(Self::is_not_empty)
    }

    pub fn have_same_size(a: &Matrix, b: &Matrix) -> bool {
        Self::is_not_empty(a) && a.shape() == b.shape()
    }

    pub fn all_same_size(matrices: &[Matrix]) -> bool {
        match matrices.first() {
            Some(first) => matrices.iter().all(|m| m.shape() == first.shape()),
            None => false,
        }
    }

    pub fn is_square(m: &Matrix) -> bool {
        Self::is_not_empty(m) && m.nrows() == m.ncols()
    }

    pub fn are_square(matrices: &[Matrix]) -> bool {
        !matrices.is_empty() && matrices.iter().all(Self::is_square)
    }

    pub fn validate_in_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
        if !Self::in_range(value, min, max) {
            return Err(GeometryError::OutOfRange(format!(
                "{} = {} not in [{}, {}]",
                name, value, min, max
            )));
        }
        Ok(())
    }

    pub fn validate_not_empty(context: &str, m: &Matrix) -> Result<()> {
        if !Self::is_not_empty(m) {
            return Err(GeometryError::empty(context));
        }
        Ok(())
    }

    pub fn validate_square(context: &str, m: &Matrix) -> Result<()> {
        if !Self::is_square(m) {
            return Err(GeometryError::not_square(context, m.nrows(), m.ncols()));
        }
        Ok(())
    }

    /// Non-empty set of square matrices sharing one shape.
    pub fn validate_square_set(context: &str, matrices: &[Matrix]) -> Result<()> {
        let first = matrices.first().ok_or_else(|| GeometryError::empty(context))?;
        Self::validate_square(context, first)?;
        if let Some(other) = matrices.iter().find(|m| m.shape() != first.shape()) {
            return Err(GeometryError::size_mismatch(context, first.shape(), other.shape()));
        }
        Ok(())
    }

    pub fn validate_same_size(context: &str, a: &Matrix, b: &Matrix) -> Result<()> {
        if !Self::have_same_size(a, b) {
            return Err(GeometryError::size_mismatch(context, a.shape(), b.shape()));
        }
        Ok(())
    }

    pub fn validate_file_path(path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(GeometryError::Validation(format!(
                "Path is not a file: {}",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn validate_json_extension(path: &Path) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(()),
            _ => Err(GeometryError::Validation(format!(
                "File is not a json file: {}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_in_range() {
        assert!(Validator::in_range(0.5, 0.0, 1.0));
        assert!(Validator::in_range(1.0, 0.0, 1.0));
        assert!(!Validator::in_range(1.1, 0.0, 1.0));
        assert!(Validator::validate_in_range("alpha", -0.1, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_emptiness() {
        assert!(!Validator::is_not_empty(&Matrix::zeros(0, 3)));
        assert!(Validator::is_not_empty(&Matrix::zeros(1, 3)));
        assert!(!Validator::are_not_empty(&[]));
        assert!(!Validator::are_not_empty(&[Matrix::identity(2, 2), Matrix::zeros(0, 0)]));
    }

    #[test]
    fn test_sizes() {
        let a = Matrix::identity(2, 2);
        assert!(Validator::have_same_size(&a, &Matrix::zeros(2, 2)));
        assert!(!Validator::have_same_size(&Matrix::zeros(0, 0), &Matrix::zeros(0, 0)));
        assert!(!Validator::all_same_size(&[]));
        assert!(!Validator::all_same_size(&[a.clone(), Matrix::zeros(3, 3)]));
        assert!(Validator::validate_same_size("test", &a, &Matrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_square() {
        assert!(Validator::is_square(&Matrix::identity(3, 3)));
        assert!(!Validator::is_square(&Matrix::zeros(2, 3)));
        assert!(!Validator::are_square(&[]));
        assert!(Validator::validate_square_set("set", &[Matrix::identity(2, 2), Matrix::identity(2, 2)]).is_ok());
        assert!(Validator::validate_square_set("set", &[Matrix::identity(2, 2), Matrix::identity(3, 3)]).is_err());
    }

    #[test]
    fn test_validate_file_path() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("trials.json");
        fs::write(&file_path, "{}").unwrap();

        assert!(Validator::validate_file_path(&file_path).is_ok());
        assert!(Validator::validate_file_path(Path::new("/nonexistent")).is_err());
        assert!(Validator::validate_json_extension(&file_path).is_ok());
        assert!(Validator::validate_json_extension(Path::new("trials.csv")).is_err());
    }
}
