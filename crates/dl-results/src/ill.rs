//! Flat `.ill` map files and `.glr` glare files.

use crate::{ResultsError, ResultsResult};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const ILL_HEADER: [&str; 3] = [
    "## OpenStudio Daylight Simulation Results file",
    "## Header: xmin ymin z xmax ymin z xmax ymax z xspacing yspacing",
    "## Data: month,day,time,directNormalIllumimance(external),diffuseHorizontalIlluminance(external),daylightSensorIlluminance,pointIlluminance [lux]",
];

pub const GLR_HEADER: [&str; 2] = [
    "## OpenStudio Daylight Simulation (glare) Results file",
    "## Data: month,day,time,DGPSimplified values",
];

/// Plane geometry line of an `.ill` file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapGeometry {
    pub x_min: f64,
    pub y_min: f64,
    pub z: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub x_spacing: f64,
    pub y_spacing: f64,
}

/// Month, day and hour-ending of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStamp {
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl RowStamp {
    fn format(&self) -> String {
        format!("{},{},{:02}:00:00", self.month, self.day, self.hour)
    }

    fn parse(fields: &[&str]) -> Option<Self> {
        let hour = fields.get(2)?.split(':').next()?.parse().ok()?;
        Some(Self {
            month: fields.first()?.parse().ok()?,
            day: fields.get(1)?.parse().ok()?,
            hour,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IllRow {
    pub stamp: RowStamp,
    pub direct_normal: f64,
    pub diffuse_horizontal: f64,
    pub sensor: f64,
    pub grid: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlareRow {
    pub stamp: RowStamp,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IllFile {
    pub geometry: MapGeometry,
    pub rows: Vec<IllRow>,
}

pub fn write_ill(path: &Path, geometry: &MapGeometry, rows: &[IllRow]) -> ResultsResult<()> {
    let mut out = String::new();
    for line in ILL_HEADER {
        out.push_str(line);
        out.push('\n');
    }
    let g = geometry;
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} {} {} {} {} {}",
        g.x_min, g.y_min, g.z, g.x_max, g.y_min, g.z, g.x_max, g.y_max, g.z, g.x_spacing, g.y_spacing
    );
    for row in rows {
        let _ = write!(
            out,
            "{},{},{},{}",
            row.stamp.format(),
            row.direct_normal,
            row.diffuse_horizontal,
            row.sensor
        );
        for v in &row.grid {
            let _ = write!(out, ",{v}");
        }
        out.push('\n');
    }
    write_file(path, &out)
}

pub fn write_glr(path: &Path, rows: &[GlareRow]) -> ResultsResult<()> {
    let mut out = String::new();
    for line in GLR_HEADER {
        out.push_str(line);
        out.push('\n');
    }
    for row in rows {
        out.push_str(&row.stamp.format());
        for v in &row.values {
            let _ = write!(out, ",{v}");
        }
        out.push('\n');
    }
    write_file(path, &out)
}

pub fn read_ill(path: &Path) -> ResultsResult<IllFile> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();
    for expected in ILL_HEADER {
        if lines.next() != Some(expected) {
            return Err(format_error(path, "missing or altered header line"));
        }
    }

    let geometry_line = lines
        .next()
        .ok_or_else(|| format_error(path, "missing geometry line"))?;
    let g = parse_numbers(geometry_line.split_whitespace())
        .filter(|g| g.len() == 11)
        .ok_or_else(|| format_error(path, "geometry line needs 11 numbers"))?;
    let geometry = MapGeometry {
        x_min: g[0],
        y_min: g[1],
        z: g[2],
        x_max: g[3],
        y_max: g[7],
        x_spacing: g[9],
        y_spacing: g[10],
    };

    let mut rows = Vec::new();
    for (i, line) in lines.filter(|l| !l.trim().is_empty()).enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let bad = || format_error(path, &format!("malformed data row {}", i + 1));
        let stamp = RowStamp::parse(&fields).ok_or_else(bad)?;
        let numbers = parse_numbers(fields.iter().skip(3).copied()).ok_or_else(bad)?;
        if numbers.len() < 3 {
            return Err(bad());
        }
        rows.push(IllRow {
            stamp,
            direct_normal: numbers[0],
            diffuse_horizontal: numbers[1],
            sensor: numbers[2],
            grid: numbers[3..].to_vec(),
        });
    }
    Ok(IllFile { geometry, rows })
}

pub fn read_glr(path: &Path) -> ResultsResult<Vec<GlareRow>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();
    for expected in GLR_HEADER {
        if lines.next() != Some(expected) {
            return Err(format_error(path, "missing or altered header line"));
        }
    }
    lines
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let bad = || format_error(path, &format!("malformed glare row {}", i + 1));
            Ok(GlareRow {
                stamp: RowStamp::parse(&fields).ok_or_else(bad)?,
                values: parse_numbers(fields.iter().skip(3).copied()).ok_or_else(bad)?,
            })
        })
        .collect()
}

fn parse_numbers<'a>(fields: impl Iterator<Item = &'a str>) -> Option<Vec<f64>> {
    fields
        .map(|f| f.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn write_file(path: &Path, content: &str) -> ResultsResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn format_error(path: &Path, reason: &str) -> ResultsError {
    ResultsError::FileFormat {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> MapGeometry {
        MapGeometry {
            x_min: 0.0,
            y_min: 0.0,
            z: 0.8,
            x_max: 6.0,
            y_max: 4.0,
            x_spacing: 2.0,
            y_spacing: 2.0,
        }
    }

    #[test]
    fn ill_file_layout() {
        let dir = std::env::temp_dir().join("dl_results_ill_layout");
        let path = dir.join("Office_map.ill");
        let rows = vec![IllRow {
            stamp: RowStamp {
                month: 6,
                day: 21,
                hour: 9,
            },
            direct_normal: 50000.0,
            diffuse_horizontal: 12000.0,
            sensor: 450.0,
            grid: vec![100.0, 200.0, 300.0, 400.0, 500.0, 600.0],
        }];
        write_ill(&path, &geometry(), &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ILL_HEADER[0]);
        assert_eq!(lines[3], "0 0 0.8 6 0 0.8 6 4 0.8 2 2");
        assert_eq!(lines[4], "6,21,09:00:00,50000,12000,450,100,200,300,400,500,600");

        let parsed = read_ill(&path).unwrap();
        assert_eq!(parsed.geometry, geometry());
        assert_eq!(parsed.rows, rows);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_foreign_header() {
        let dir = std::env::temp_dir().join("dl_results_ill_header");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.ill");
        std::fs::write(&path, "## something else\n").unwrap();
        assert!(matches!(
            read_ill(&path),
            Err(ResultsError::FileFormat { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn glare_rows() {
        let dir = std::env::temp_dir().join("dl_results_glr");
        let path = dir.join("Office_map.glr");
        let rows = vec![GlareRow {
            stamp: RowStamp {
                month: 1,
                day: 1,
                hour: 24,
            },
            values: vec![0.184, 0.35],
        }];
        write_glr(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("1,1,24:00:00,0.184,0.35\n"));
        assert_eq!(read_glr(&path).unwrap(), rows);
        std::fs::remove_dir_all(&dir).ok();
    }
}
