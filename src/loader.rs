// Whitespace-delimited matrix reader for field and density output files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::reshape::{self, ExpandedFrame};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("field has {field_frames} frames but density has {density_frames}")]
    ShapeMismatch {
        field_frames: usize,
        density_frames: usize,
    },
}

/// Row-major matrix: one row per frame, one column per spatial sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first()?.len();
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Self { rows: n, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }
}

/// Parse a whitespace-delimited matrix. Blank lines are skipped and
/// everything after `#` is a comment. The returned error carries an empty
/// path; `load_matrix` fills it in.
pub fn parse_matrix(text: &str) -> Result<Matrix, LoadError> {
    let parse_err = |line: usize, message: String| LoadError::Parse {
        path: PathBuf::new(),
        line,
        message,
    };

    let mut data = Vec::new();
    let mut rows = 0;
    let mut cols = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut count = 0;
        for token in line.split_whitespace() {
            let v: f64 = token
                .parse()
                .map_err(|_| parse_err(idx + 1, format!("invalid number '{token}'")))?;
            data.push(v);
            count += 1;
        }

        match cols {
            None => cols = Some(count),
            Some(expected) if expected != count => {
                return Err(parse_err(
                    idx + 1,
                    format!("expected {expected} columns, found {count}"),
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let Some(cols) = cols else {
        return Err(parse_err(0, "no data rows".into()));
    };

    Ok(Matrix { rows, cols, data })
}

/// Read and parse a matrix file.
pub fn load_matrix(path: impl AsRef<Path>) -> Result<Matrix, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound { path: path.to_path_buf() },
        _ => LoadError::Io { path: path.to_path_buf(), source: e },
    })?;

    // Undecodable bytes are malformed data, reported on the line they occur.
    let text = String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        LoadError::Parse {
            path: path.to_path_buf(),
            line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            message: "invalid UTF-8".into(),
        }
    })?;

    parse_matrix(&text).map_err(|e| match e {
        LoadError::Parse { line, message, .. } => LoadError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        },
        other => other,
    })
}

/// Field and density matrices with matching frame counts.
#[derive(Debug)]
pub struct Dataset {
    field: Matrix,
    density: Matrix,
}

impl Dataset {
    pub fn new(field: Matrix, density: Matrix) -> Result<Self, LoadError> {
        if field.rows() != density.rows() {
            return Err(LoadError::ShapeMismatch {
                field_frames: field.rows(),
                density_frames: density.rows(),
            });
        }
        Ok(Self { field, density })
    }

    pub fn load(field_path: impl AsRef<Path>, density_path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let field = load_matrix(field_path)?;
        let density = load_matrix(density_path)?;
        Self::new(field, density)
    }

    pub fn frame_count(&self) -> usize {
        self.field.rows()
    }

    /// Spatial samples per field frame.
    pub fn field_len(&self) -> usize {
        self.field.cols()
    }

    /// Spatial samples per density frame.
    pub fn density_len(&self) -> usize {
        self.density.cols()
    }

    pub fn field_frame(&self, index: usize) -> &[f64] {
        self.field.row(index)
    }

    pub fn density_frame(&self, index: usize) -> &[f64] {
        self.density.row(index)
    }

    /// Square view of density frame `index`, built on demand.
    pub fn expanded_density(&self, index: usize) -> ExpandedFrame<'_> {
        reshape::expand(self.density.row(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_basic_matrix() {
        let m = parse_matrix("1 2 3\n4 5 6\n").unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_trailing_spaces_and_tabs() {
        // Simulation output writes "v " per sample, so every line ends in a space.
        let m = parse_matrix("0.5 -1e-3 \n2\t3.25 \n").unwrap();
        assert_eq!(m.row(0), &[0.5, -1e-3]);
        assert_eq!(m.row(1), &[2.0, 3.25]);
    }

    #[test]
    fn test_parse_skips_blank_lines_and_comments() {
        let m = parse_matrix("# header\n\n1 2\n   \n3 4 # tail\n").unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_parse_single_row() {
        let m = parse_matrix("7 8 9").unwrap();
        assert_eq!(m.rows(), 1);
        assert_eq!(m.cols(), 3);
    }

    #[test]
    fn test_parse_non_numeric_token() {
        let err = parse_matrix("1 2\n3 abc\n").unwrap_err();
        match err {
            LoadError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("abc"), "message was {message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ragged_rows() {
        let err = parse_matrix("1 2 3\n4 5\n").unwrap_err();
        match err {
            LoadError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("expected 3 columns"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse_matrix(""), Err(LoadError::Parse { .. })));
        assert!(matches!(parse_matrix("\n  \n# only comment\n"), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        match load_matrix(&path) {
            Err(LoadError::NotFound { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_load_parse_error_carries_path() {
        let file = write_temp("1 2\nx y\n");
        match load_matrix(file.path()) {
            Err(LoadError::Parse { path, line, .. }) => {
                assert_eq!(path, file.path());
                assert_eq!(line, 2);
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_load_non_utf8_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"1 2\n\xff\xfe\n").unwrap();
        match load_matrix(file.path()) {
            Err(LoadError::Parse { path, line, message }) => {
                assert_eq!(path, file.path());
                assert_eq!(line, 2);
                assert_eq!(message, "invalid UTF-8");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_dataset_load_scenario() {
        let field = write_temp("1 2 3\n4 5 6\n");
        let density = write_temp("0 -1\n2 2\n");
        let ds = Dataset::load(field.path(), density.path()).unwrap();
        assert_eq!(ds.frame_count(), 2);
        assert_eq!(ds.field_len(), 3);
        assert_eq!(ds.density_len(), 2);
        assert_eq!(ds.field_frame(1), &[4.0, 5.0, 6.0]);
        assert_eq!(ds.density_frame(0), &[0.0, -1.0]);
        assert_eq!(ds.expanded_density(0).to_rows(), vec![vec![0.0, -1.0], vec![0.0, -1.0]]);
        assert_eq!(ds.expanded_density(1).to_rows(), vec![vec![2.0, 2.0], vec![2.0, 2.0]]);
    }

    #[test]
    fn test_dataset_frame_count_mismatch() {
        let field = Matrix::from_rows(vec![vec![0.0; 3]; 5]).unwrap();
        let density = Matrix::from_rows(vec![vec![0.0; 3]; 4]).unwrap();
        match Dataset::new(field, density) {
            Err(LoadError::ShapeMismatch { field_frames, density_frames }) => {
                assert_eq!(field_frames, 5);
                assert_eq!(density_frames, 4);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_dataset_load_mismatch_from_files() {
        let field = write_temp("1\n2\n3\n4\n5\n");
        let density = write_temp("1\n2\n3\n4\n");
        assert!(matches!(
            Dataset::load(field.path(), density.path()),
            Err(LoadError::ShapeMismatch { field_frames: 5, density_frames: 4 })
        ));
    }

    #[test]
    fn test_matrix_from_rows_rejects_ragged() {
        assert!(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_none());
        assert!(Matrix::from_rows(vec![]).is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = LoadError::ShapeMismatch { field_frames: 5, density_frames: 4 };
        assert_eq!(err.to_string(), "field has 5 frames but density has 4");
        let err = LoadError::NotFound { path: PathBuf::from("data.dat") };
        assert_eq!(err.to_string(), "file not found: data.dat");
    }
}
