//! `nvcc`-backed kernel compiler: CUDA C source in, PTX file out.

use crate::cuda_codegen::Kernel;
use crate::error::RuntimeError;
use crate::runtime::KernelCompiler;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A kernel compiled to PTX on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtxModule {
    pub name: String,
    pub cu_path: PathBuf,
    pub ptx_path: PathBuf,
}

impl PtxModule {
    pub fn read_ptx(&self) -> Result<String, RuntimeError> {
        Ok(fs::read_to_string(&self.ptx_path)?)
    }
}

#[derive(Debug, Clone)]
pub struct NvccCompiler {
    program: String,
    extra_args: Vec<String>,
}

impl Default for NvccCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl NvccCompiler {
    pub fn new() -> Self {
        Self::with_program("nvcc")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        NvccCompiler {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra flags passed before the input file, e.g. `-arch=sm_80`
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Staging file names for a kernel: `.kernelize_NAME.cu` and `.ptx`
    pub fn staging_paths(name: &str, staging_dir: &Path) -> (PathBuf, PathBuf) {
        (
            staging_dir.join(format!(".kernelize_{}.cu", name)),
            staging_dir.join(format!(".kernelize_{}.ptx", name)),
        )
    }
}

impl KernelCompiler for NvccCompiler {
    type Module = PtxModule;

    fn compile(&self, kernel: &Kernel, staging_dir: &Path) -> Result<PtxModule, RuntimeError> {
        fs::create_dir_all(staging_dir)?;
        let (cu_path, ptx_path) = Self::staging_paths(&kernel.name, staging_dir);
        fs::write(&cu_path, &kernel.source)?;

        let mut command = Command::new(&self.program);
        command.args(&self.extra_args).arg("-ptx").arg(&cu_path).arg("-o").arg(&ptx_path);
        debug!(?command, "running kernel compiler");

        let output = command.output()?;
        if !output.status.success() {
            return Err(RuntimeError::Compile {
                name: kernel.name.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(PtxModule {
            name: kernel.name.clone(),
            cu_path,
            ptx_path,
        })
    }
}
