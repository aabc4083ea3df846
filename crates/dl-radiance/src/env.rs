//! Radiance installation discovery and process environment.

use crate::tool::{ToolInvocation, ToolRunner};
use crate::{RadianceError, RadianceResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tools shipped as perl scripts on Windows builds of Radiance.
const PERL_SCRIPTS: &[&str] = &["genskyvec", "genklemsamp"];

#[derive(Debug, Clone, Default)]
pub struct RadianceEnv {
    bin_dir: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    base_path: OsString,
    base_raypath: OsString,
}

impl RadianceEnv {
    /// Locates the installation from an explicit directory, `RADIANCE_PATH`, or `PATH`.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let base_path = std::env::var_os("PATH").unwrap_or_default();
        let base_raypath = std::env::var_os("RAYPATH").unwrap_or_default();

        let root = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("RADIANCE_PATH").map(PathBuf::from));

        let (bin_dir, lib_dir) = match root {
            Some(root) => (Some(root.join("bin")), Some(root.join("lib"))),
            None => {
                let bin = std::env::split_paths(&base_path)
                    .find(|dir| dir.join(executable_name("rtrace")).is_file());
                let lib = bin
                    .as_ref()
                    .and_then(|b| b.parent())
                    .map(|root| root.join("lib"));
                (bin, lib)
            }
        };

        match &bin_dir {
            Some(dir) => info!(bin = %dir.display(), "using Radiance installation"),
            None => debug!("no Radiance installation found, relying on PATH"),
        }

        Self {
            bin_dir,
            lib_dir,
            base_path,
            base_raypath,
        }
    }

    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }

    /// `PATH` with the Radiance `bin` directory in front.
    pub fn path_var(&self) -> OsString {
        prepend(self.bin_dir.as_deref(), &self.base_path)
    }

    /// `RAYPATH` with the current directory and the Radiance `lib` directory in front.
    pub fn raypath_var(&self) -> OsString {
        let with_lib = prepend(self.lib_dir.as_deref(), &self.base_raypath);
        prepend(Some(Path::new(".")), &with_lib)
    }

    /// Program and leading arguments to launch `tool`.
    pub fn resolve(&self, tool: &str) -> (String, Vec<String>) {
        if cfg!(windows) && PERL_SCRIPTS.contains(&tool) {
            let script = match &self.bin_dir {
                Some(bin) => bin.join(format!("{tool}.pl")),
                None => PathBuf::from(format!("{tool}.pl")),
            };
            return ("perl".to_string(), vec![script.to_string_lossy().into_owned()]);
        }
        if let Some(bin) = &self.bin_dir {
            let candidate = bin.join(executable_name(tool));
            if candidate.is_file() {
                return (candidate.to_string_lossy().into_owned(), Vec::new());
            }
        }
        (tool.to_string(), Vec::new())
    }
}

/// Fails unless `rtrace -version` runs (and perl, where scripts need it).
pub fn check_available(runner: &dyn ToolRunner) -> RadianceResult<()> {
    let mut required = vec![ToolInvocation::new("rtrace").arg("-version")];
    if cfg!(windows) {
        required.push(ToolInvocation::new("perl").arg("-v"));
    }
    for invocation in required {
        let ok = runner
            .run(&invocation)
            .map(|out| out.success())
            .unwrap_or(false);
        if !ok {
            return Err(RadianceError::ToolNotFound {
                tool: invocation.program,
            });
        }
    }
    Ok(())
}

fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

fn prepend(dir: Option<&Path>, existing: &OsString) -> OsString {
    let Some(dir) = dir else {
        return existing.clone();
    };
    let mut parts = vec![dir.to_path_buf()];
    parts.extend(std::env::split_paths(existing));
    std::env::join_paths(parts).unwrap_or_else(|_| existing.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOutput;

    struct Fixed(Option<i32>);

    impl ToolRunner for Fixed {
        fn run(&self, _invocation: &ToolInvocation) -> RadianceResult<ToolOutput> {
            Ok(ToolOutput {
                status: self.0,
                ..ToolOutput::default()
            })
        }
    }

    #[test]
    fn explicit_root_prefixes_path() {
        let env = RadianceEnv::discover(Some(Path::new("/opt/radiance")));
        let path = env.path_var();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/opt/radiance/bin"));
        let raypath: Vec<PathBuf> = std::env::split_paths(&env.raypath_var()).collect();
        assert_eq!(raypath[0], PathBuf::from("."));
        assert_eq!(raypath[1], PathBuf::from("/opt/radiance/lib"));
    }

    #[test]
    fn unknown_tool_resolves_to_bare_name() {
        let env = RadianceEnv::discover(Some(Path::new("/nonexistent/radiance")));
        let (program, prefix) = env.resolve("rcontrib");
        assert_eq!(program, "rcontrib");
        assert!(prefix.is_empty());
    }

    #[test]
    fn availability_check() {
        assert!(check_available(&Fixed(Some(0))).is_ok());
        let err = check_available(&Fixed(Some(1))).unwrap_err();
        assert!(err.to_string().contains("Cannot find required Radiance executable"));
    }
}
