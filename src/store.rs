//! JSON boundary: cost matrices in, coordinates out.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::coordinate_set::CoordinateSet;
use crate::cost_matrix::CostMatrix;

#[derive(Deserialize)]
struct Params {
    c_ij: Vec<Vec<f64>>,
}

/// Accepted layouts of a matrix file.
#[derive(Deserialize)]
#[serde(untagged)]
enum MatrixFile {
    Bare(Vec<Vec<f64>>),
    Flat { c_ij: Vec<Vec<f64>> },
    Nested { params: Params },
}

impl MatrixFile {
    fn into_rows(self) -> Vec<Vec<f64>> {
        match self {
            MatrixFile::Bare(rows) => rows,
            MatrixFile::Flat { c_ij } => c_ij,
            MatrixFile::Nested { params } => params.c_ij,
        }
    }
}

/// Parses matrix rows from a bare 2D array, `{"c_ij": ...}` or `{"params": {"c_ij": ...}}`.
pub fn parse_matrix_rows(text: &str) -> Result<Vec<Vec<f64>>> {
    let file: MatrixFile = serde_json::from_str(text)
        .map_err(|e| anyhow!("Expected a 2D number array, optionally under \"c_ij\" or \"params.c_ij\": {}", e))?;
    Ok(file.into_rows())
}

pub fn read_matrix_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_matrix_rows(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reads a facility x customer cost matrix (rows are facilities).
pub fn read_cost_matrix(path: &Path) -> Result<CostMatrix> {
    let rows = read_matrix_rows(path)?;
    let matrix = CostMatrix::from_rows(&rows).with_context(|| format!("Invalid cost matrix in {}", path.display()))?;
    Ok(matrix)
}

/// Writes coordinates as a JSON array of `[x, y]` pairs, facilities first.
pub fn write_coordinates(path: &Path, coordinates: &CoordinateSet) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &coordinates.to_pairs())
        .with_context(|| format!("Failed to write coordinates to {}", path.display()))
}

/// Reads `[x, y]` pairs; the first `n_facilities` are tagged as facilities.
pub fn read_coordinates(path: &Path, n_facilities: usize) -> Result<CoordinateSet> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let pairs: Vec<[f64; 2]> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Expected an array of [x, y] pairs in {}", path.display()))?;
    let coordinates = CoordinateSet::from_pairs(&pairs, n_facilities)?;
    Ok(coordinates)
}
