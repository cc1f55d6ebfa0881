use kernelize::{
    parse_source, transpile_cached, transpile_named, transpile_source, DeviceContext, Kernel,
    KernelCompiler, KernelOptions, LaunchConfig, Launcher, RuntimeError, TranspileError,
};
use std::path::Path;
use std::sync::Arc;

const EXAMPLES: &str = r#"
def mul(a, b):
    return a * b


def encrypt(a, key):
    return (a + key) % 26


def do_work(a, b):
    local = 0
    local += a + b[0]
    local += a - b[1]
    local += a * b[2]
    local += a % b[3]
    return local


def do_work2(d):
    d = d % 2
    d = d * 3
    d = d / 5
    d = d + 1
    d ^= 0x55555555
    d |= 0x77777777
    d &= 0x33333333
    d |= 0x11111111
    return d
"#;

fn kernel(name: &str) -> Kernel {
    transpile_named(EXAMPLES, name, &KernelOptions::default()).expect("translation")
}

#[test]
fn test_encrypt_kernel() {
    let expected = [
        "extern \"C\" __global__ void encrypt(",
        "\tfloat *a,",
        "\tfloat *key,",
        "\tfloat *kernel_result",
        ") {",
        "\tconst unsigned int kernel_index = (blockIdx.x * blockDim.x) + threadIdx.x;",
        "",
        "\tkernel_result[kernel_index] = ((a[kernel_index] + key[kernel_index]) % 26);",
        "}",
    ]
    .join("\n");

    let kernel = kernel("encrypt");
    assert_eq!(kernel.source, expected);
    assert_eq!(kernel.params, vec!["a", "key", "kernel_result"]);
}

#[test]
fn test_hex_operands_and_parameter_targets() {
    let expected = [
        "extern \"C\" __global__ void do_work2(",
        "\tfloat *d,",
        "\tfloat *kernel_result",
        ") {",
        "\tconst unsigned int kernel_index = (blockIdx.x * blockDim.x) + threadIdx.x;",
        "",
        "\td[kernel_index] = (d[kernel_index] % 2);",
        "\td[kernel_index] = (d[kernel_index] * 3);",
        "\td[kernel_index] = (d[kernel_index] / 5);",
        "\td[kernel_index] = (d[kernel_index] + 1);",
        "\td[kernel_index] ^= 1431655765;",
        "\td[kernel_index] |= 2004318071;",
        "\td[kernel_index] &= 858993459;",
        "\td[kernel_index] |= 286331153;",
        "\tkernel_result[kernel_index] = d[kernel_index];",
        "}",
    ]
    .join("\n");

    assert_eq!(kernel("do_work2").source, expected);
}

#[test]
fn test_subscript_accumulation() {
    let expected = [
        "extern \"C\" __global__ void do_work(",
        "\tfloat *a,",
        "\tfloat *b,",
        "\tfloat *kernel_result",
        ") {",
        "\tconst unsigned int kernel_index = (blockIdx.x * blockDim.x) + threadIdx.x;",
        "\tfloat local = 0;",
        "",
        "\tlocal = 0;",
        "\tlocal += (a[kernel_index] + b[0]);",
        "\tlocal += (a[kernel_index] - b[1]);",
        "\tlocal += (a[kernel_index] * b[2]);",
        "\tlocal += (a[kernel_index] % b[3]);",
        "\tkernel_result[kernel_index] = local;",
        "}",
    ]
    .join("\n");

    let kernel = kernel("do_work");
    assert_eq!(kernel.source, expected);
    assert_eq!(kernel.source.matches("float local = 0;").count(), 1);
}

#[test]
fn test_every_supported_operator_in_return() {
    for op in ["*", "+", "-", "%", "/", "^", "&", "|"] {
        let source = format!("def apply(a, b):\n    return a {} b\n", op);
        let kernel = transpile_source(&source).unwrap();
        let expected = format!("\tkernel_result[kernel_index] = (a[kernel_index] {} b[kernel_index]);", op);
        let body: Vec<&str> = kernel.source.lines().skip_while(|line| !line.is_empty()).skip(1).collect();
        assert_eq!(body, vec![expected.as_str(), "}"], "operator {}", op);
    }
}

#[test]
fn test_each_return_writes_result_slot() {
    let source = "\
def pick(a, b):
    return a
    return b * 2
";
    let kernel = transpile_source(source).unwrap();
    let writes: Vec<&str> = kernel.source.lines()
        .filter(|line| line.starts_with("\tkernel_result[kernel_index] = "))
        .collect();
    assert_eq!(
        writes,
        vec![
            "\tkernel_result[kernel_index] = a[kernel_index];",
            "\tkernel_result[kernel_index] = (b[kernel_index] * 2);",
        ]
    );
}

#[test]
fn test_structural_specs_are_validated() {
    use kernelize::{Expression, FunctionSpec, Parameter, Statement};

    let dup = FunctionSpec::new(
        "dup",
        vec![Parameter::new("a"), Parameter::new("a")],
        vec![Statement::Return(Some(Expression::name("a")))],
    );
    assert!(matches!(kernelize::transpile(&dup), Err(TranspileError::ParseError { .. })));
    assert!(matches!(
        transpile_cached(&dup, &KernelOptions::default()),
        Err(TranspileError::ParseError { .. })
    ));
}

#[test]
fn test_float_literal_out_of_range() {
    let err = transpile_source("def f(a):\n    return a * 1e400\n").unwrap_err();
    assert!(matches!(err, TranspileError::ParseError { line: 2, .. }));
}

#[test]
fn test_floor_division_rejected() {
    let err = transpile_source("def halve(a):\n    return a // 2\n").unwrap_err();
    assert_eq!(err, TranspileError::UnsupportedOperator { op: "//".to_string() });
    assert_eq!(err.to_string(), "Unsupported operator '//'");
}

#[test]
fn test_translation_is_deterministic() {
    let module = parse_source(EXAMPLES).unwrap();
    for func in &module.functions {
        let first = kernelize::transpile(func).unwrap();
        let second = kernelize::transpile(func).unwrap();
        assert_eq!(first, second);
        assert!(first.source.starts_with(&format!("extern \"C\" __global__ void {}(", func.name)));
        assert!(!first.source.ends_with('\n'));
    }
}

#[test]
fn test_locals_declared_once_in_first_use_order() {
    let source = "\
def blend(a, b):
    t = a * 2
    s = b + t
    t = t + s
    return t + s
";
    let kernel = transpile_source(source).unwrap();
    let declarations: Vec<&str> = kernel.source.lines()
        .filter(|line| line.starts_with("\tfloat ") && line.ends_with(" = 0;"))
        .collect();
    assert_eq!(declarations, vec!["\tfloat t = 0;", "\tfloat s = 0;"]);
}

#[test]
fn test_annotations() {
    let kernel = transpile_source("def f(a: int, b):\n    return a + b\n").unwrap();
    assert!(kernel.source.contains("\tint *a,\n\tfloat *b,\n"));

    let err = transpile_source("def f(a: np.float32):\n    return a\n").unwrap_err();
    assert_eq!(
        err,
        TranspileError::AnnotationError {
            param: "a".to_string(),
            annotation: "np.float32".to_string(),
        }
    );
}

#[test]
fn test_control_flow_and_calls_rejected() {
    let cases = [
        ("def f(a):\n    if a:\n        return a\n    return a\n", "if statement"),
        ("def f(a):\n    while a:\n        a = a - 1\n    return a\n", "while loop"),
        ("def f(a):\n    for i in a:\n        pass\n    return a\n", "for loop"),
        ("def f(a):\n    print(a)\n    return a\n", "function call"),
        ("def f(a):\n    return abs(a)\n", "function call"),
    ];
    for (source, construct) in cases {
        let err = transpile_source(source).unwrap_err();
        assert_eq!(err, TranspileError::unsupported_construct(construct), "{}", source);
    }
}

#[test]
fn test_docstring_ignored() {
    let kernel = transpile_source("def f(a):\n    \"\"\"Identity.\"\"\"\n    return a\n").unwrap();
    assert!(!kernel.source.contains("Identity"));
    assert!(kernel.source.ends_with("\n\tkernel_result[kernel_index] = a[kernel_index];\n}"));
}

#[test]
fn test_parse_errors_carry_positions() {
    match transpile_source("def f(a):\nreturn a\n").unwrap_err() {
        TranspileError::ParseError { line, .. } => assert_eq!(line, 2),
        other => panic!("expected parse error, got {:?}", other),
    }
    assert!(matches!(
        transpile_source("x = 1\n"),
        Err(TranspileError::ParseError { .. })
    ));
    assert!(matches!(transpile_source(""), Err(TranspileError::ParseError { .. })));
}

#[test]
fn test_cached_translation_shared() {
    let module = parse_source(EXAMPLES).unwrap();
    let func = module.function("mul").unwrap();
    let options = KernelOptions::default();

    let first = transpile_cached(func, &options).unwrap();
    let reparsed = parse_source(EXAMPLES).unwrap();
    let second = transpile_cached(reparsed.function("mul").unwrap(), &options).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

struct SourceCompiler;

impl KernelCompiler for SourceCompiler {
    type Module = String;

    fn compile(&self, kernel: &Kernel, _staging_dir: &Path) -> Result<String, RuntimeError> {
        Ok(kernel.source.clone())
    }
}

/// Evaluates `mul` on the host in place of a real device
#[derive(Default)]
struct HostDevice {
    stored: Vec<String>,
    slots: Vec<Vec<f32>>,
    launches: Vec<LaunchConfig>,
}

impl DeviceContext for HostDevice {
    type Module = String;

    fn init(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn store_compiled_function(&mut self, name: &str, module: &String) -> Result<(), RuntimeError> {
        assert!(module.contains(&format!("void {}(", name)));
        self.stored.push(name.to_string());
        Ok(())
    }

    fn reset_params(&mut self) -> Result<(), RuntimeError> {
        self.slots.clear();
        Ok(())
    }

    fn alloc_param(&mut self, slot: usize, host: &[f32]) -> Result<(), RuntimeError> {
        assert_eq!(slot, self.slots.len());
        self.slots.push(vec![0.0; host.len()]);
        Ok(())
    }

    fn copy_to_device(&mut self, slot: usize, host: &[f32]) -> Result<(), RuntimeError> {
        self.slots[slot].copy_from_slice(host);
        Ok(())
    }

    fn launch(&mut self, name: &str, config: LaunchConfig) -> Result<(), RuntimeError> {
        if name != "mul" {
            return Err(RuntimeError::Device(format!("unknown kernel '{}'", name)));
        }
        self.launches.push(config);
        let product: Vec<f32> = self.slots[0].iter().zip(&self.slots[1]).map(|(a, b)| a * b).collect();
        self.slots[2] = product;
        Ok(())
    }

    fn copy_from_device(&mut self, slot: usize, host: &mut [f32]) -> Result<(), RuntimeError> {
        host.copy_from_slice(&self.slots[slot]);
        Ok(())
    }
}

#[test]
fn test_launcher_runs_parsed_function() {
    let module = parse_source(EXAMPLES).unwrap();
    let mul = module.function("mul").unwrap();

    let a: Vec<f32> = (0..10).map(|i| i as f32).collect();
    let b = vec![2.0f32; 10];

    let mut launcher = Launcher::new(SourceCompiler, HostDevice::default());
    let out = launcher.run(mul, &[&a, &b]).unwrap();
    assert_eq!(out, (0..10).map(|i| (i * 2) as f32).collect::<Vec<_>>());

    launcher.run(mul, &[&a, &b]).unwrap();
    assert_eq!(launcher.device().stored, vec!["mul"]);
    assert_eq!(launcher.device().launches[0], LaunchConfig::for_elements(10, 1));
    assert_eq!(launcher.device().launches[0].grid_dim, (10, 1, 1));
}
