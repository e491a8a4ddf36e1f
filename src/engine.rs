//! Running the external TeX engine that turns the document into a PDF.

use crate::config::LatexConfig;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Name the engine gives a document read from stdin.
pub const STDIN_JOB_NAME: &str = "texput";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("TeX engine `{0}` was not found; install it or set `engine` in [output.latex]")]
    NotFound(String),
    #[error("failed to start TeX engine `{engine}`")]
    Spawn {
        engine: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to communicate with TeX engine `{engine}`")]
    Io {
        engine: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TeX engine `{engine}` failed ({status})")]
    Failed { engine: String, status: ExitStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub program: String,
    pub args: Vec<String>,
}

impl Engine {
    pub fn from_config(config: &LatexConfig) -> Engine {
        Engine {
            program: config.engine.clone(),
            args: config.engine_args.clone(),
        }
    }

    /// Full argument list for compiling stdin into the working directory.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--outfmt=pdf".to_string());
        args.push("-o".to_string());
        args.push(".".to_string());
        args.push("-".to_string());
        args
    }

    /// Pipes `document` into the engine and returns the path of the PDF it wrote.
    ///
    /// The engine runs inside `outdir`, where the document's relative image paths
    /// point.
    pub fn compile(&self, document: &str, outdir: &Path) -> Result<PathBuf, EngineError> {
        log::info!(
            "running {} {} in {}",
            self.program,
            self.arguments().join(" "),
            outdir.display()
        );
        let mut child = Command::new(&self.program)
            .args(self.arguments())
            .current_dir(outdir)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => EngineError::NotFound(self.program.clone()),
                _ => EngineError::Spawn {
                    engine: self.program.clone(),
                    source,
                },
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(document.as_bytes()) {
                Ok(()) => {}
                // the engine quit early; its exit status says why
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(source) => {
                    return Err(EngineError::Io {
                        engine: self.program.clone(),
                        source,
                    })
                }
            }
        }

        let status = child.wait().map_err(|source| EngineError::Io {
            engine: self.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(EngineError::Failed {
                engine: self.program.clone(),
                status,
            });
        }

        Ok(outdir.join(format!("{STDIN_JOB_NAME}.pdf")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_build_engine_arguments() {
        let config = LatexConfig {
            engine_args: vec!["--keep-logs".to_string()],
            ..Default::default()
        };
        let engine = Engine::from_config(&config);
        assert_eq!(engine.program, "tectonic");
        assert_eq!(
            engine.arguments(),
            vec!["--keep-logs", "--outfmt=pdf", "-o", ".", "-"]
        );
    }

    #[test]
    fn missing_engine_is_reported() {
        let engine = Engine {
            program: "mdbook-tectonic-no-such-engine".to_string(),
            args: Vec::new(),
        };
        let err = engine
            .compile("", Path::new("."))
            .expect_err("engine does not exist");
        assert!(matches!(err, EngineError::NotFound(ref name) if name == "mdbook-tectonic-no-such-engine"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_engine_is_an_error() {
        let engine = Engine {
            program: "false".to_string(),
            args: Vec::new(),
        };
        let err = engine
            .compile(r"\documentclass{article}", Path::new("."))
            .expect_err("`false` always fails");
        assert!(matches!(err, EngineError::Failed { status, .. } if status.code() == Some(1)));
    }

    #[cfg(unix)]
    #[test]
    fn successful_engine_yields_the_stdin_job_pdf() {
        let engine = Engine {
            program: "true".to_string(),
            args: Vec::new(),
        };
        let out = tempfile::tempdir().expect("can create temp dir");
        let pdf = engine
            .compile("", out.path())
            .expect("`true` always succeeds");
        assert_eq!(pdf, out.path().join("texput.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn engine_runs_inside_the_output_directory() {
        let out = tempfile::tempdir().expect("can create temp dir");
        let engine = Engine {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "pwd > engine_cwd.txt".to_string(), "sh".to_string()],
        };
        engine
            .compile("", out.path())
            .expect("script succeeds");
        let cwd = std::fs::read_to_string(out.path().join("engine_cwd.txt"))
            .expect("engine wrote into the output directory");
        let cwd = PathBuf::from(cwd.trim());
        assert_eq!(
            cwd.canonicalize().expect("cwd exists"),
            out.path().canonicalize().expect("outdir exists")
        );
    }
}
