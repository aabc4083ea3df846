//! Coefficient option files under `options/`.

use crate::{RadianceError, RadianceResult};
use std::path::{Path, PathBuf};

/// Parameter strings for sky binning, daylight matrices and view matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientOptions {
    /// Klems sampling arguments for `genklemsamp` (first two tokens of `treg.opt`).
    pub klems_sampling: Vec<String>,
    /// Sky binning arguments for `rcontrib` (remaining tokens of `treg.opt`).
    pub sky_binning: Vec<String>,
    /// Sky subdivision passed to `gendaymtx -m` and `genskyvec -m`.
    pub sky_density: u32,
    pub dmx: Vec<String>,
    pub vmx: Vec<String>,
}

impl CoefficientOptions {
    pub fn load(radiance_dir: &Path) -> RadianceResult<Self> {
        let dir = radiance_dir.join("options");
        let treg_path = dir.join("treg.opt");
        let treg = read_tokens(&treg_path)?;
        let dmx = read_tokens(&dir.join("dmx.opt"))?;
        let vmx = read_tokens(&dir.join("vmx.opt"))?;
        Self::from_tokens(treg, dmx, vmx).map_err(|reason| RadianceError::OptionFile {
            path: treg_path,
            reason,
        })
    }

    fn from_tokens(treg: Vec<String>, dmx: Vec<String>, vmx: Vec<String>) -> Result<Self, String> {
        if treg.len() < 3 {
            return Err(format!(
                "expected sampling and binning arguments, found {} tokens",
                treg.len()
            ));
        }
        let sky_density = match treg.get(3).and_then(|t| t.split_once(':')) {
            Some((_, density)) => density
                .parse()
                .map_err(|_| format!("invalid sky density '{density}'"))?,
            None => 1,
        };
        Ok(Self {
            klems_sampling: treg[..2].to_vec(),
            sky_binning: treg[2..].to_vec(),
            sky_density,
            dmx,
            vmx,
        })
    }
}

fn read_tokens(path: &Path) -> RadianceResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| RadianceError::OptionFile {
        path: PathBuf::from(path),
        reason: e.to_string(),
    })?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn splits_treg_line() {
        let opts = CoefficientOptions::from_tokens(
            tokens("-c 1000 -e MF:4 -f reinhart.cal -b rbin -bn Nrbins"),
            tokens("-ab 2 -ad 1000"),
            tokens("-ab 8 -ad 65536"),
        )
        .unwrap();
        assert_eq!(opts.klems_sampling, tokens("-c 1000"));
        assert_eq!(opts.sky_binning[0], "-e");
        assert_eq!(opts.sky_density, 4);
        assert_eq!(opts.vmx.len(), 4);
    }

    #[test]
    fn density_defaults_to_one() {
        let opts =
            CoefficientOptions::from_tokens(tokens("-c 1000 -f tregenza.cal"), vec![], vec![])
                .unwrap();
        assert_eq!(opts.sky_density, 1);
    }

    #[test]
    fn rejects_short_line() {
        assert!(CoefficientOptions::from_tokens(tokens("-c"), vec![], vec![]).is_err());
    }

    #[test]
    fn loads_from_directory() {
        let dir = std::env::temp_dir().join("dl_radiance_options_test");
        std::fs::create_dir_all(dir.join("options")).unwrap();
        std::fs::write(
            dir.join("options/treg.opt"),
            "-c 1000 -e MF:1 -f tregenza.cal -b tbin -bn Ntbins\n",
        )
        .unwrap();
        std::fs::write(dir.join("options/dmx.opt"), "-ab 2\n").unwrap();
        std::fs::write(dir.join("options/vmx.opt"), "-ab 6\n").unwrap();
        let opts = CoefficientOptions::load(&dir).unwrap();
        assert_eq!(opts.sky_density, 1);
        assert_eq!(opts.dmx, tokens("-ab 2"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
