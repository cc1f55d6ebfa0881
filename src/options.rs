/// Name of the implicit output buffer every kernel receives
pub const RESULT: &str = "kernel_result";

/// Name of the per-thread global index variable
pub const INDEX: &str = "kernel_index";

/// Element type used for unannotated parameters, the result buffer and locals
pub const DEFAULT_ELEMENT_TYPE: &str = "float";

/// Knobs for the generated kernel text. The defaults produce the canonical
/// kernel shape; the CLI exposes each field as a flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelOptions {
    pub result_name: String,
    pub index_name: String,
    /// Pointer element type for parameters without an annotation
    pub default_element_type: String,
    /// Element type of the result buffer
    pub result_element_type: String,
    /// Declared type of scratch locals
    pub local_type: String,
}

impl Default for KernelOptions {
    fn default() -> Self {
        KernelOptions {
            result_name: RESULT.to_string(),
            index_name: INDEX.to_string(),
            default_element_type: DEFAULT_ELEMENT_TYPE.to_string(),
            result_element_type: DEFAULT_ELEMENT_TYPE.to_string(),
            local_type: DEFAULT_ELEMENT_TYPE.to_string(),
        }
    }
}

impl KernelOptions {
    /// Names the generated kernel defines itself; host code may not reuse them.
    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.result_name || name == self.index_name
    }
}
