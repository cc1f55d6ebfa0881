// kernelize
// Translates straight-line Python-style element functions into CUDA C kernels

pub mod lexer;
pub mod token;
pub mod error;
pub mod ast;
pub mod parser;
pub mod symbols;
pub mod options;
pub mod classify;
pub mod emit;
pub mod cuda_codegen;
pub mod cache;
pub mod runtime;
pub mod nvcc;

use std::sync::Arc;

pub use lexer::Lexer;
pub use token::{Token, TokenType};
pub use error::{RuntimeError, TranspileError};
pub use ast::{Expression, Statement, Module, BinaryOperator, UnaryOperator, Literal, Parameter, FunctionSpec};
pub use parser::Parser;
pub use options::{KernelOptions, RESULT, INDEX, DEFAULT_ELEMENT_TYPE};
pub use cuda_codegen::{CudaCodegen, Kernel};
pub use cache::TranslationCache;
pub use runtime::{DeviceContext, KernelCompiler, LaunchConfig, Launcher, DEFAULT_THREADS_PER_BLOCK};
pub use nvcc::{NvccCompiler, PtxModule};

/// Lex and parse a source file into its function definitions
pub fn parse_source(source: &str) -> Result<Module, TranspileError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// Translate one function with the default options
pub fn transpile(func: &FunctionSpec) -> Result<Kernel, TranspileError> {
    CudaCodegen::new().generate(func)
}

/// Translate through the process-wide cache
pub fn transpile_cached(func: &FunctionSpec, options: &KernelOptions) -> Result<Arc<Kernel>, TranspileError> {
    TranslationCache::global().get_or_translate(func, options)
}

/// Translate the first function defined in `source`
pub fn transpile_source(source: &str) -> Result<Kernel, TranspileError> {
    let module = parse_source(source)?;
    let func = module.functions.first()
        .ok_or_else(|| TranspileError::parse_error("No function definition found", 1, 1))?;
    transpile(func)
}

/// Translate the function called `name` defined in `source`
pub fn transpile_named(source: &str, name: &str, options: &KernelOptions) -> Result<Kernel, TranspileError> {
    let module = parse_source(source)?;
    let func = module.function(name)
        .ok_or_else(|| TranspileError::parse_error(format!("No function named '{}'", name), 1, 1))?;
    CudaCodegen::with_options(options.clone()).generate(func)
}
