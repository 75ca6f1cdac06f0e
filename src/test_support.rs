// file: src/test_support.rs
// description: deterministic fixtures shared by unit tests
// reference: seeded ChaCha8 generator from rand_chacha

use crate::geometry::Matrix;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform entries in [-1, 1).
pub fn random_signal(rows: usize, cols: usize, seed: u64) -> Matrix {
    let mut rng = seeded(seed);
    Matrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

/// Well-conditioned SPD matrix `A A^T / cols + 0.1 I`.
pub fn random_spd(n: usize, seed: u64) -> Matrix {
    let a = random_signal(n, 4 * n, seed);
    &a * a.transpose() / (4 * n) as f64 + Matrix::identity(n, n) * 0.1
}

/// SPD matrices scattered around `center`.
pub fn spd_cloud(center: &Matrix, count: usize, spread: f64, seed: u64) -> Vec<Matrix> {
    let n = center.nrows();
    let mut rng = seeded(seed);
    (0..count)
        .map(|_| {
            let noise = Matrix::from_fn(n, n, |_, _| rng.gen_range(-spread..spread));
            let sym = (&noise + noise.transpose()) * 0.5;
            center + sym + Matrix::identity(n, n) * spread * n as f64
        })
        .collect()
}

pub fn diag(values: &[f64]) -> Matrix {
    Matrix::from_diagonal(&nalgebra::DVector::from_column_slice(values))
}

#[derive(Clone, Default)]
struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under a thread-local subscriber and returns its value with everything it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (value, logs)
}
