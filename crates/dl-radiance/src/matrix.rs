//! Radiance matrix files.
//!
//! A matrix file optionally starts with a `#?RADIANCE` header terminated by a
//! blank line. The header carries `NROWS`, `NCOLS`, `NCOMP` and `FORMAT`
//! (`ascii`, `float` or `double`). Data is row-major with three components
//! (RGB) per entry.

use crate::{RadianceError, RadianceResult};
use dl_core::{ensure_finite, rgb_to_lux};
use nalgebra::{DMatrix, DVector};

const COMPONENTS: usize = 3;
const MAGIC: &[u8] = b"#?RADIANCE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Ascii,
    Float,
    Double,
}

#[derive(Debug, Default)]
struct Header {
    rows: Option<usize>,
    cols: Option<usize>,
    comps: Option<usize>,
    format: Option<DataFormat>,
    big_endian: bool,
}

/// Dense RGB matrix as written by `rcontrib`, `gendaymtx` and `dctimestep`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl RadianceMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols * COMPONENTS],
        }
    }

    pub fn from_data(rows: usize, cols: usize, data: Vec<f64>) -> RadianceResult<Self> {
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(COMPONENTS))
            .ok_or_else(|| RadianceError::MatrixFormat {
                what: format!("{rows}x{cols} matrix is too large"),
            })?;
        if data.len() != expected {
            return Err(RadianceError::MatrixFormat {
                what: format!(
                    "{rows}x{cols} matrix needs {expected} values, found {}",
                    data.len()
                ),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Parses a matrix whose dimensions are given by its header.
    pub fn parse(bytes: &[u8]) -> RadianceResult<Self> {
        Self::parse_inner(bytes, None)
    }

    /// Parses a matrix that may lack a header; `rows` fixes the shape in that case.
    pub fn parse_with_rows(bytes: &[u8], rows: usize) -> RadianceResult<Self> {
        Self::parse_inner(bytes, Some(rows))
    }

    fn parse_inner(bytes: &[u8], rows_hint: Option<usize>) -> RadianceResult<Self> {
        let (header, body) = split_header(bytes)?;
        if let Some(comps) = header.comps
            && comps != COMPONENTS
        {
            return Err(RadianceError::MatrixFormat {
                what: format!("expected NCOMP={COMPONENTS}, found {comps}"),
            });
        }
        let format = header.format.unwrap_or(DataFormat::Ascii);
        let data = decode_body(body, format, header.big_endian)?;

        let rows = header
            .rows
            .or(rows_hint)
            .ok_or_else(|| RadianceError::MatrixFormat {
                what: "matrix has no NROWS and no expected row count".to_string(),
            })?;
        let row_len = rows.checked_mul(COMPONENTS).filter(|n| *n > 0);
        let cols = match (header.cols, row_len) {
            (Some(cols), _) => cols,
            (None, Some(row_len)) if data.len() % row_len == 0 => data.len() / row_len,
            (None, _) => {
                return Err(RadianceError::MatrixFormat {
                    what: format!(
                        "{} values do not divide into {rows} rows of RGB triplets",
                        data.len()
                    ),
                });
            }
        };
        Self::from_data(rows, cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> [f64; 3] {
        let i = (row * self.cols + col) * COMPONENTS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Copies one column out as a `rows x 1` matrix.
    pub fn column(&self, col: usize) -> RadianceResult<RadianceMatrix> {
        if col >= self.cols {
            return Err(RadianceError::Core(dl_core::DlError::IndexOob {
                what: "matrix column",
                index: col,
                len: self.cols,
            }));
        }
        let mut data = Vec::with_capacity(self.rows * COMPONENTS);
        for row in 0..self.rows {
            data.extend_from_slice(&self.get(row, col));
        }
        Self::from_data(self.rows, 1, data)
    }

    /// Converts every entry to illuminance in row-major order.
    pub fn to_lux(&self) -> Vec<f64> {
        self.data
            .chunks_exact(COMPONENTS)
            .map(|c| rgb_to_lux([c[0], c[1], c[2]]))
            .collect()
    }

    /// Writes the matrix in ASCII with a full header.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(64 + self.data.len() * 12);
        out.push_str("#?RADIANCE\n");
        out.push_str(&format!("NROWS={}\nNCOLS={}\nNCOMP=3\n", self.rows, self.cols));
        out.push_str("FORMAT=ascii\n\n");
        for row in 0..self.rows {
            for col in 0..self.cols {
                let [r, g, b] = self.get(row, col);
                out.push_str(&format!("{r:e}\t{g:e}\t{b:e}\n"));
            }
        }
        out
    }

    fn channel(&self, comp: usize) -> DMatrix<f64> {
        DMatrix::from_row_iterator(
            self.rows,
            self.cols,
            self.data.iter().skip(comp).step_by(COMPONENTS).copied(),
        )
    }
}

/// Parses `dctimestep`/`rcalc` style output: an optional header then RGB triplets.
pub fn parse_triplets(bytes: &[u8]) -> RadianceResult<Vec<[f64; 3]>> {
    let (header, body) = split_header(bytes)?;
    let format = header.format.unwrap_or(DataFormat::Ascii);
    let data = decode_body(body, format, header.big_endian)?;
    if data.len() % COMPONENTS != 0 {
        return Err(RadianceError::MatrixFormat {
            what: format!("{} values are not a whole number of triplets", data.len()),
        });
    }
    Ok(data
        .chunks_exact(COMPONENTS)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Annual sky luminance: one row per sky patch, one column per hour of the year.
#[derive(Debug, Clone)]
pub struct SkyMatrix {
    inner: RadianceMatrix,
}

impl SkyMatrix {
    pub fn new(inner: RadianceMatrix) -> Self {
        Self { inner }
    }

    pub fn patches(&self) -> usize {
        self.inner.rows()
    }

    pub fn hours(&self) -> usize {
        self.inner.cols()
    }

    /// Sky vector for one hour of the year.
    pub fn sky_vector(&self, hour_of_year: usize) -> RadianceResult<RadianceMatrix> {
        self.inner.column(hour_of_year)
    }
}

/// Daylight coefficients split into per-channel `points x patches` matrices.
#[derive(Debug, Clone)]
pub struct CoefficientMatrix {
    channels: [DMatrix<f64>; 3],
}

impl CoefficientMatrix {
    pub fn new(matrix: &RadianceMatrix) -> Self {
        Self {
            channels: [matrix.channel(0), matrix.channel(1), matrix.channel(2)],
        }
    }

    pub fn points(&self) -> usize {
        self.channels[0].nrows()
    }

    pub fn patches(&self) -> usize {
        self.channels[0].ncols()
    }

    /// Multiplies the coefficients by a sky vector and converts each point to lux.
    pub fn apply(&self, sky: &RadianceMatrix) -> RadianceResult<Vec<f64>> {
        if sky.rows() != self.patches() || sky.cols() != 1 {
            return Err(RadianceError::MatrixFormat {
                what: format!(
                    "sky vector is {}x{}, coefficients expect {}x1",
                    sky.rows(),
                    sky.cols(),
                    self.patches()
                ),
            });
        }
        let product: Vec<DVector<f64>> = (0..COMPONENTS)
            .map(|c| {
                let s = DVector::from_iterator(
                    sky.rows(),
                    sky.data().iter().skip(c).step_by(COMPONENTS).copied(),
                );
                &self.channels[c] * s
            })
            .collect();
        Ok((0..self.points())
            .map(|p| rgb_to_lux([product[0][p], product[1][p], product[2][p]]))
            .collect())
    }
}

fn split_header(bytes: &[u8]) -> RadianceResult<(Header, &[u8])> {
    let mut header = Header::default();
    if !bytes.starts_with(MAGIC) {
        return Ok((header, bytes));
    }

    let end = find_header_end(bytes).ok_or_else(|| RadianceError::MatrixFormat {
        what: "header is not terminated by a blank line".to_string(),
    })?;
    let text = String::from_utf8_lossy(&bytes[..end.0]);
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "NROWS" => header.rows = Some(parse_dim(key, value)?),
            "NCOLS" => header.cols = Some(parse_dim(key, value)?),
            "NCOMP" => header.comps = Some(parse_dim(key, value)?),
            "FORMAT" => {
                header.format = Some(match value {
                    "ascii" => DataFormat::Ascii,
                    "float" => DataFormat::Float,
                    "double" => DataFormat::Double,
                    other => {
                        return Err(RadianceError::MatrixFormat {
                            what: format!("unsupported FORMAT={other}"),
                        });
                    }
                })
            }
            "BYTEORDER" => header.big_endian = value.eq_ignore_ascii_case("BigEndian"),
            _ => {}
        }
    }
    Ok((header, &bytes[end.1..]))
}

/// Returns (header length, body offset).
fn find_header_end(bytes: &[u8]) -> Option<(usize, usize)> {
    bytes
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|i| (i, i + 2))
        .or_else(|| {
            bytes
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .map(|i| (i, i + 4))
        })
}

fn parse_dim(key: &str, value: &str) -> RadianceResult<usize> {
    value.parse().map_err(|_| RadianceError::MatrixFormat {
        what: format!("invalid {key}={value}"),
    })
}

fn decode_body(body: &[u8], format: DataFormat, big_endian: bool) -> RadianceResult<Vec<f64>> {
    match format {
        DataFormat::Ascii => {
            let text = String::from_utf8_lossy(body);
            text.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .map(|t| -> RadianceResult<f64> {
                    let v: f64 = t.parse().map_err(|_| RadianceError::MatrixFormat {
                        what: format!("invalid number '{t}'"),
                    })?;
                    Ok(ensure_finite(v, "matrix value")?)
                })
                .collect()
        }
        DataFormat::Float => decode_binary::<4>(body, |b| {
            if big_endian {
                f32::from_be_bytes(b) as f64
            } else {
                f32::from_le_bytes(b) as f64
            }
        }),
        DataFormat::Double => decode_binary::<8>(body, |b| {
            if big_endian {
                f64::from_be_bytes(b)
            } else {
                f64::from_le_bytes(b)
            }
        }),
    }
}

fn decode_binary<const N: usize>(
    body: &[u8],
    convert: impl Fn([u8; N]) -> f64,
) -> RadianceResult<Vec<f64>> {
    if body.len() % N != 0 {
        return Err(RadianceError::MatrixFormat {
            what: format!("{} bytes are not a whole number of {N}-byte values", body.len()),
        });
    }
    body.chunks_exact(N)
        .map(|chunk| -> RadianceResult<f64> {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            Ok(ensure_finite(convert(buf), "matrix value")?)
        })
        .collect()
}
