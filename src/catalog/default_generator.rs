// Default entries
//
// Some entries exist before anybody creates them. A catalog set asks its
// generator for them the first time a lookup misses, and materializes the
// result as if it had been committed at the bootstrap timestamp.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::catalog::entry::CatalogObject;
use crate::catalog::function::ScalarFunction;
use crate::catalog::schema::DataType;

/// Source of entries that are materialized lazily on first reference
pub trait DefaultGenerator: Send + Sync {
    /// Build the default entry called `name`, if there is one
    fn create_default_entry(&self, name: &str) -> Option<Arc<dyn CatalogObject>>;

    /// Names of every default entry, used before a full scan
    fn default_entries(&self) -> Vec<String>;
}

static BUILTIN_FUNCTIONS: Lazy<Vec<ScalarFunction>> = Lazy::new(|| {
    vec![
        ScalarFunction::builtin("abs", vec![DataType::Float], DataType::Float),
        ScalarFunction::builtin("lower", vec![DataType::Text], DataType::Text),
        ScalarFunction::builtin("upper", vec![DataType::Text], DataType::Text),
        ScalarFunction::builtin("length", vec![DataType::Text], DataType::Integer),
        ScalarFunction::builtin("concat", vec![DataType::Text, DataType::Text], DataType::Text),
        ScalarFunction::builtin("round", vec![DataType::Float, DataType::Integer], DataType::Float),
    ]
});

/// Serves the built-in scalar functions
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFunctionGenerator;

impl DefaultGenerator for BuiltinFunctionGenerator {
    fn create_default_entry(&self, name: &str) -> Option<Arc<dyn CatalogObject>> {
        BUILTIN_FUNCTIONS
            .iter()
            .find(|function| function.name() == name)
            .map(|function| Arc::new(function.clone()) as Arc<dyn CatalogObject>)
    }

    fn default_entries(&self) -> Vec<String> {
        BUILTIN_FUNCTIONS.iter().map(|function| function.name().to_string()).collect()
    }
}
