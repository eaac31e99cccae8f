use std::any::Any;

use serde::{Serialize, Deserialize};

use super::entry::{CatalogObject, CatalogType};
use super::schema::DataType;

/// Signature of a scalar function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFunction {
    name: String,
    arguments: Vec<DataType>,
    return_type: DataType,
    /// Built-in functions are internal and cannot be dropped
    internal: bool,
}

impl ScalarFunction {
    pub fn new(name: String, arguments: Vec<DataType>, return_type: DataType) -> Self {
        ScalarFunction {
            name,
            arguments,
            return_type,
            internal: false,
        }
    }

    pub(crate) fn builtin(name: &str, arguments: Vec<DataType>, return_type: DataType) -> Self {
        ScalarFunction {
            name: name.to_string(),
            arguments,
            return_type,
            internal: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[DataType] {
        &self.arguments
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Signature as `name(ARG, ...) -> RET`
    pub fn signature(&self) -> String {
        let args: Vec<String> = self.arguments.iter().map(|arg| arg.to_string()).collect();
        format!("{}({}) -> {}", self.name, args.join(", "), self.return_type)
    }
}

impl CatalogObject for ScalarFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn catalog_type(&self) -> CatalogType {
        CatalogType::ScalarFunction
    }

    fn is_internal(&self) -> bool {
        self.internal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
