// file: src/io/matrix_serde.rs
// description: serde adapters writing matrices as nested row arrays
// reference: https://serde.rs/custom-serialization.html

use crate::geometry::Matrix;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn to_rows(m: &Matrix) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

/// Rebuilds a matrix from rows. `[]` is the empty 0x0 matrix.
pub fn from_rows(rows: &[Vec<f64>]) -> Result<Matrix, String> {
    let Some(first) = rows.first() else {
        return Ok(Matrix::zeros(0, 0));
    };
    let cols = first.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(format!(
            "ragged matrix: row {} has {} values, expected {}",
            i,
            row.len(),
            cols
        ));
    }
    Ok(Matrix::from_fn(rows.len(), cols, |i, j| rows[i][j]))
}

pub fn serialize<S: Serializer>(m: &Matrix, serializer: S) -> Result<S::Ok, S::Error> {
    to_rows(m).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Matrix, D::Error> {
    let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
    from_rows(&rows).map_err(D::Error::custom)
}

pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(ms: &[Matrix], serializer: S) -> Result<S::Ok, S::Error> {
        ms.iter().map(to_rows).collect::<Vec<_>>().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Matrix>, D::Error> {
        let raw = Vec::<Vec<Vec<f64>>>::deserialize(deserializer)?;
        raw.iter()
            .map(|rows| from_rows(rows).map_err(D::Error::custom))
            .collect()
    }
}

pub mod vec2 {
    use super::*;

    pub fn serialize<S: Serializer>(classes: &[Vec<Matrix>], serializer: S) -> Result<S::Ok, S::Error> {
        classes
            .iter()
            .map(|ms| ms.iter().map(to_rows).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<Matrix>>, D::Error> {
        let raw = Vec::<Vec<Vec<Vec<f64>>>>::deserialize(deserializer)?;
        raw.iter()
            .map(|class| {
                class
                    .iter()
                    .map(|rows| from_rows(rows).map_err(D::Error::custom))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        single: Matrix,
        #[serde(with = "super::vec")]
        many: Vec<Matrix>,
    }

    #[test]
    fn test_matrix_is_written_row_by_row() {
        let holder = Holder {
            single: Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            many: vec![Matrix::identity(1, 1)],
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"single":[[1.0,2.0,3.0],[4.0,5.0,6.0]],"many":[[[1.0]]]}"#);
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = serde_json::from_str::<Holder>(r#"{"single":[[1.0],[2.0,3.0]],"many":[]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_matrix() {
        assert_eq!(from_rows(&[]).unwrap().shape(), (0, 0));
        assert!(to_rows(&Matrix::zeros(0, 0)).is_empty());
    }
}
