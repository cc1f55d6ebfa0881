use crate::ast::{Expression, FunctionSpec, Parameter};
use crate::classify::IdentifierClassifier;
use crate::emit::Emitter;
use crate::error::TranspileError;
use crate::options::KernelOptions;
use std::fmt;
use tracing::{debug, instrument};

/// A translated kernel: one `extern "C" __global__` definition plus the
/// buffer slot order the host side must follow when binding arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    pub name: String,
    pub source: String,
    /// Parameter names in declaration order, followed by the result buffer
    pub params: Vec<String>,
}

impl Kernel {
    /// Slot of the implicit result buffer
    pub fn result_slot(&self) -> usize {
        self.params.len().saturating_sub(1)
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// CUDA C code generator
/// Builds one elementwise kernel per host function: every parameter becomes a
/// device buffer indexed by the global thread index, and the return value is
/// stored into an appended result buffer.
#[derive(Debug, Clone, Default)]
pub struct CudaCodegen {
    options: KernelOptions,
}

impl CudaCodegen {
    pub fn new() -> Self {
        CudaCodegen::default()
    }

    pub fn with_options(options: KernelOptions) -> Self {
        CudaCodegen { options }
    }

    pub fn options(&self) -> &KernelOptions {
        &self.options
    }

    /// Translate a function. Either the whole kernel is produced or an error
    /// is returned; there is no partial output.
    #[instrument(skip(self, func), fields(kernel = %func.name))]
    pub fn generate(&self, func: &FunctionSpec) -> Result<Kernel, TranspileError> {
        func.validate()?;

        let signature = func.params.iter()
            .map(|p| Ok((self.element_type(p)?, p.name.as_str())))
            .collect::<Result<Vec<_>, TranspileError>>()?;

        // Collect: walk the body once, buffering lines while locals are discovered
        let classifier = IdentifierClassifier::new(func.param_names(), &self.options)?;
        let mut emitter = Emitter::new(classifier, &self.options);
        let mut body = Vec::with_capacity(func.body.len());
        for stmt in &func.body {
            if let Some(line) = emitter.emit_statement(stmt)? {
                body.push(line);
            }
        }
        debug!(
            statements = func.body.len(),
            lines = body.len(),
            locals = emitter.locals().len(),
            "collected kernel body"
        );

        // Flush: header, index, declarations, then the buffered body
        let mut lines = vec![format!("extern \"C\" __global__ void {}(", func.name)];
        for (ty, name) in &signature {
            lines.push(format!("\t{} *{},", ty, name));
        }
        lines.push(format!(
            "\t{} *{}",
            self.options.result_element_type, self.options.result_name
        ));
        lines.push(") {".to_string());
        lines.push(format!(
            "\tconst unsigned int {} = (blockIdx.x * blockDim.x) + threadIdx.x;",
            self.options.index_name
        ));
        for local in emitter.locals() {
            lines.push(format!("\t{} {} = 0;", self.options.local_type, local));
        }
        lines.push(String::new());
        lines.extend(body.iter().map(|line| format!("\t{}", line)));
        lines.push("}".to_string());

        let mut params: Vec<String> = func.param_names().map(String::from).collect();
        params.push(self.options.result_name.clone());

        Ok(Kernel {
            name: func.name.clone(),
            source: lines.join("\n"),
            params,
        })
    }

    fn element_type(&self, param: &Parameter) -> Result<String, TranspileError> {
        match &param.annotation {
            None => Ok(self.options.default_element_type.clone()),
            Some(Expression::Name(ty)) => Ok(ty.clone()),
            Some(other) => Err(TranspileError::AnnotationError {
                param: param.name.clone(),
                annotation: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Statement};

    fn mul() -> FunctionSpec {
        FunctionSpec::new(
            "mul",
            vec![Parameter::new("a"), Parameter::new("b")],
            vec![Statement::Return(Some(Expression::binary(
                Expression::name("a"),
                BinaryOperator::Mul,
                Expression::name("b"),
            )))],
        )
    }

    #[test]
    fn test_cuda_basic_kernel() {
        let kernel = CudaCodegen::new().generate(&mul()).expect("cuda generation");
        let expected = [
            "extern \"C\" __global__ void mul(",
            "\tfloat *a,",
            "\tfloat *b,",
            "\tfloat *kernel_result",
            ") {",
            "\tconst unsigned int kernel_index = (blockIdx.x * blockDim.x) + threadIdx.x;",
            "",
            "\tkernel_result[kernel_index] = (a[kernel_index] * b[kernel_index]);",
            "}",
        ]
        .join("\n");
        assert_eq!(kernel.source, expected);
        assert_eq!(kernel.params, vec!["a", "b", "kernel_result"]);
        assert_eq!(kernel.result_slot(), 2);
    }

    #[test]
    fn test_cuda_annotated_parameters() {
        let mut func = mul();
        func.params[1] = Parameter::annotated("b", Expression::name("int"));
        let kernel = CudaCodegen::new().generate(&func).unwrap();
        assert!(kernel.source.contains("\tfloat *a,\n\tint *b,\n"));

        func.params[1] = Parameter::annotated("b", Expression::subscript(Expression::name("List"), Expression::name("int")));
        let err = CudaCodegen::new().generate(&func).unwrap_err();
        assert_eq!(
            err,
            TranspileError::AnnotationError {
                param: "b".to_string(),
                annotation: "List[int]".to_string(),
            }
        );
    }

    #[test]
    fn test_cuda_custom_options() {
        let options = KernelOptions {
            result_name: "out".to_string(),
            index_name: "i".to_string(),
            default_element_type: "double".to_string(),
            result_element_type: "double".to_string(),
            local_type: "double".to_string(),
        };
        let kernel = CudaCodegen::with_options(options).generate(&mul()).unwrap();
        assert!(kernel.source.contains("\tdouble *a,"));
        assert!(kernel.source.contains("\tdouble *out\n"));
        assert!(kernel.source.contains("\tout[i] = (a[i] * b[i]);"));
    }

    #[test]
    fn test_cuda_rejects_duplicate_parameters() {
        let mut func = mul();
        func.params[1] = Parameter::new("a");
        let err = CudaCodegen::new().generate(&func).unwrap_err();
        assert_eq!(err, TranspileError::parse_error("Duplicate parameter 'a'", 0, 0));
    }

    #[test]
    fn test_cuda_rejects_invalid_assignment_target() {
        let mut func = mul();
        func.body.insert(
            0,
            Statement::Assign {
                target: Expression::binary(Expression::name("a"), BinaryOperator::Add, Expression::int(1)),
                value: Expression::int(2),
            },
        );
        let err = CudaCodegen::new().generate(&func).unwrap_err();
        assert_eq!(err, TranspileError::parse_error("Cannot assign to binary operation", 0, 0));
    }

    #[test]
    fn test_result_slot_of_empty_kernel() {
        let kernel = Kernel {
            name: "empty".to_string(),
            source: String::new(),
            params: vec![],
        };
        assert_eq!(kernel.result_slot(), 0);
    }

    #[test]
    fn test_cuda_no_partial_output_on_error() {
        let mut func = mul();
        func.body.push(Statement::While {
            condition: Expression::name("a"),
            body: vec![],
        });
        let err = CudaCodegen::new().generate(&func).unwrap_err();
        assert_eq!(err, TranspileError::unsupported_construct("while loop"));
    }
}
