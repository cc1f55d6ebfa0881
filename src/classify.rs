//! Identifier classification: device-buffer parameters vs. scratch locals.

use crate::error::TranspileError;
use crate::options::KernelOptions;
use rustc_hash::FxHashSet;

/// Tracks the fixed parameter set and the locals discovered while walking a
/// function body. A name is classified at most once and never changes class.
pub struct IdentifierClassifier<'a> {
    options: &'a KernelOptions,
    parameters: FxHashSet<String>,
    locals: Vec<String>,
    seen_locals: FxHashSet<String>,
}

impl<'a> IdentifierClassifier<'a> {
    pub fn new<'p>(
        parameters: impl IntoIterator<Item = &'p str>,
        options: &'a KernelOptions,
    ) -> Result<Self, TranspileError> {
        let mut set = FxHashSet::default();
        for name in parameters {
            if options.is_reserved(name) {
                return Err(reserved(name));
            }
            set.insert(name.to_string());
        }

        Ok(IdentifierClassifier {
            options,
            parameters: set,
            locals: Vec::new(),
            seen_locals: FxHashSet::default(),
        })
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }

    /// Renders a name read or written by the body. Parameters become a
    /// per-thread buffer access; anything else is recorded as a local on
    /// first sight and rendered bare.
    pub fn visit_name(&mut self, name: &str) -> Result<String, TranspileError> {
        if self.is_parameter(name) {
            return Ok(format!("{}[{}]", name, self.options.index_name));
        }
        if self.options.is_reserved(name) {
            return Err(reserved(name));
        }
        if self.seen_locals.insert(name.to_string()) {
            self.locals.push(name.to_string());
        }
        Ok(name.to_string())
    }

    /// Locals in first-occurrence order
    pub fn locals(&self) -> &[String] {
        &self.locals
    }
}

fn reserved(name: &str) -> TranspileError {
    TranspileError::unsupported_construct(format!("use of reserved kernel name '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_render_indexed() {
        let options = KernelOptions::default();
        let mut classifier = IdentifierClassifier::new(["a", "b"], &options).unwrap();

        assert_eq!(classifier.visit_name("a").unwrap(), "a[kernel_index]");
        assert_eq!(classifier.visit_name("b").unwrap(), "b[kernel_index]");
        assert!(classifier.locals().is_empty());
    }

    #[test]
    fn test_locals_classified_once_in_order() {
        let options = KernelOptions::default();
        let mut classifier = IdentifierClassifier::new(["a"], &options).unwrap();

        for name in ["tmp", "a", "acc", "tmp", "acc"] {
            classifier.visit_name(name).unwrap();
        }
        assert_eq!(classifier.locals(), ["tmp".to_string(), "acc".to_string()]);
        assert_eq!(classifier.visit_name("tmp").unwrap(), "tmp");
    }

    #[test]
    fn test_reserved_names_rejected() {
        let options = KernelOptions::default();
        assert!(IdentifierClassifier::new(["kernel_result"], &options).is_err());

        let mut classifier = IdentifierClassifier::new(["a"], &options).unwrap();
        let err = classifier.visit_name("kernel_index").unwrap_err();
        assert!(matches!(err, TranspileError::UnsupportedConstruct { .. }));
    }
}
