//! Host-side orchestration: compile a translated kernel once, bind buffers,
//! launch it and read the result back.
//!
//! The compiler and the device are collaborators behind traits; the translation
//! core never calls them.

use crate::ast::FunctionSpec;
use crate::cache::TranslationCache;
use crate::cuda_codegen::Kernel;
use crate::error::RuntimeError;
use crate::options::KernelOptions;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One thread per block unless the caller asks otherwise
pub const DEFAULT_THREADS_PER_BLOCK: u32 = 1;

/// Kernel launch configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Grid dimensions (blocks in x, y, z).
    pub grid_dim: (u32, u32, u32),
    /// Block dimensions (threads in x, y, z).
    pub block_dim: (u32, u32, u32),
}

impl LaunchConfig {
    /// A 1D launch covering `n` elements. Counts beyond `u32::MAX` saturate;
    /// `Launcher` rejects such buffers before building a config.
    pub fn for_elements(n: usize, threads_per_block: u32) -> Self {
        let block = threads_per_block.max(1);
        let grid = u32::try_from(n).unwrap_or(u32::MAX).div_ceil(block);
        Self {
            grid_dim: (grid, 1, 1),
            block_dim: (block, 1, 1),
        }
    }

    pub fn total_threads(&self) -> u64 {
        let grid = self.grid_dim.0 as u64 * self.grid_dim.1 as u64 * self.grid_dim.2 as u64;
        let block = self.block_dim.0 as u64 * self.block_dim.1 as u64 * self.block_dim.2 as u64;
        grid * block
    }
}

/// Turns kernel source into something a device context can load.
pub trait KernelCompiler {
    type Module;

    fn compile(&self, kernel: &Kernel, staging_dir: &Path) -> Result<Self::Module, RuntimeError>;
}

/// An accelerator context holding compiled functions and parameter buffers.
/// Slots are the positions in `Kernel::params`.
pub trait DeviceContext {
    type Module;

    fn init(&mut self) -> Result<(), RuntimeError>;

    fn store_compiled_function(&mut self, name: &str, module: &Self::Module) -> Result<(), RuntimeError>;

    /// Drop the buffers bound by a previous launch.
    fn reset_params(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn alloc_param(&mut self, slot: usize, host: &[f32]) -> Result<(), RuntimeError>;

    fn copy_to_device(&mut self, slot: usize, host: &[f32]) -> Result<(), RuntimeError>;

    fn launch(&mut self, name: &str, config: LaunchConfig) -> Result<(), RuntimeError>;

    fn copy_from_device(&mut self, slot: usize, host: &mut [f32]) -> Result<(), RuntimeError>;
}

/// Runs host functions on a device, one element per thread.
pub struct Launcher<C, D> {
    compiler: C,
    device: D,
    options: KernelOptions,
    staging_dir: PathBuf,
    threads_per_block: u32,
    initialized: bool,
    /// Kernels already stored in the device context, by name
    loaded: FxHashMap<String, Arc<Kernel>>,
}

impl<C, D> Launcher<C, D>
where
    C: KernelCompiler,
    D: DeviceContext<Module = C::Module>,
{
    pub fn new(compiler: C, device: D) -> Self {
        Launcher {
            compiler,
            device,
            options: KernelOptions::default(),
            staging_dir: PathBuf::from("."),
            threads_per_block: DEFAULT_THREADS_PER_BLOCK,
            initialized: false,
            loaded: FxHashMap::default(),
        }
    }

    pub fn with_options(mut self, options: KernelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_threads_per_block(mut self, threads: u32) -> Self {
        self.threads_per_block = threads;
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Run `func` over equally sized input buffers, one per parameter.
    pub fn run(&mut self, func: &FunctionSpec, args: &[&[f32]]) -> Result<Vec<f32>, RuntimeError> {
        let n = args.first().map_or(0, |a| a.len());
        let config = LaunchConfig::for_elements(n, self.threads_per_block);
        self.run_with(func, args, config)
    }

    pub fn run_with(
        &mut self,
        func: &FunctionSpec,
        args: &[&[f32]],
        config: LaunchConfig,
    ) -> Result<Vec<f32>, RuntimeError> {
        check_arguments(func, args)?;
        let kernel = TranslationCache::global().get_or_translate(func, &self.options)?;

        if !self.initialized {
            self.device.init()?;
            self.initialized = true;
        }
        self.ensure_loaded(&kernel)?;

        // The result buffer is sized like the first argument and starts zeroed
        let mut result = vec![0.0f32; args[0].len()];
        let result_slot = kernel.result_slot();

        self.device.reset_params()?;
        for (slot, host) in args.iter().enumerate() {
            self.device.alloc_param(slot, host)?;
        }
        self.device.alloc_param(result_slot, &result)?;
        for (slot, host) in args.iter().enumerate() {
            self.device.copy_to_device(slot, host)?;
        }
        self.device.copy_to_device(result_slot, &result)?;

        debug!(
            kernel = %kernel.name,
            grid = config.grid_dim.0,
            block = config.block_dim.0,
            elements = result.len(),
            "launching kernel"
        );
        self.device.launch(&kernel.name, config)?;
        self.device.copy_from_device(result_slot, &mut result)?;

        Ok(result)
    }

    /// Compile and store a kernel unless the device already holds this exact
    /// source under the same name.
    fn ensure_loaded(&mut self, kernel: &Arc<Kernel>) -> Result<(), RuntimeError> {
        if let Some(loaded) = self.loaded.get(&kernel.name) {
            if loaded.source == kernel.source {
                return Ok(());
            }
            info!(kernel = %kernel.name, "kernel source changed, recompiling");
        }

        info!(kernel = %kernel.name, dir = %self.staging_dir.display(), "compiling kernel");
        let module = self.compiler.compile(kernel, &self.staging_dir)?;
        self.device.store_compiled_function(&kernel.name, &module)?;
        self.loaded.insert(kernel.name.clone(), Arc::clone(kernel));
        Ok(())
    }
}

fn check_arguments(func: &FunctionSpec, args: &[&[f32]]) -> Result<(), RuntimeError> {
    let mismatch = |message: String| RuntimeError::ArgumentMismatch {
        name: func.name.clone(),
        message,
    };

    if args.len() != func.params.len() {
        return Err(mismatch(format!(
            "expected {} buffers, got {}",
            func.params.len(),
            args.len()
        )));
    }
    let Some(first) = args.first() else {
        return Err(mismatch("kernels need at least one input buffer".to_string()));
    };
    if first.is_empty() {
        return Err(mismatch("input buffers are empty".to_string()));
    }
    check_element_count(first.len()).map_err(mismatch)?;
    if let Some((i, arg)) = args.iter().enumerate().find(|(_, a)| a.len() != first.len()) {
        return Err(mismatch(format!(
            "buffer '{}' has {} elements, expected {}",
            func.params[i].name,
            arg.len(),
            first.len()
        )));
    }
    Ok(())
}

/// A 1D launch indexes elements with a 32-bit thread index
fn check_element_count(len: usize) -> Result<u32, String> {
    u32::try_from(len).map_err(|_| {
        format!("{} elements exceed the launch limit of {}", len, u32::MAX)
    })
}
