#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("tool host error: {0}")]
    ToolHost(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("argument decode error: {0}")]
    ArgumentDecode(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl BenchError {
    pub fn type_name(&self) -> &'static str {
        match self {
            BenchError::Configuration(_) => "ConfigurationError",
            BenchError::ToolHost(_) => "ToolHostError",
            BenchError::Model(_) => "ModelError",
            BenchError::ArgumentDecode(_) => "ArgumentDecodeError",
            BenchError::TaskNotFound(_) => "TaskNotFound",
            BenchError::InvalidData(_) => "InvalidData",
        }
    }
}
