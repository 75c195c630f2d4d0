use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SnidResult<T> = Result<T, SnidError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnidErrorCategory {
    UsageError,
    IoSystemError,
    ToolExecutionError,
    OutputFormatError,
}

impl SnidErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::UsageError => 2,
            Self::IoSystemError => 3,
            Self::ToolExecutionError => 4,
            Self::OutputFormatError => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::UsageError => "UsageError",
            Self::IoSystemError => "IoSystemError",
            Self::ToolExecutionError => "ToolExecutionError",
            Self::OutputFormatError => "OutputFormatError",
        }
    }
}

/// Crate-wide error: a stable category (mapped to the CLI exit code), a
/// short machine placeholder, and a human message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnidError {
    category: SnidErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SnidError {
    pub fn new(
        category: SnidErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn usage(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SnidErrorCategory::UsageError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SnidErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn tool_execution(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SnidErrorCategory::ToolExecutionError, placeholder, message)
    }

    pub fn output_format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SnidErrorCategory::OutputFormatError, placeholder, message)
    }

    pub const fn category(&self) -> SnidErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

impl Display for SnidError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SnidError {}

#[cfg(test)]
mod tests {
    use super::{SnidError, SnidErrorCategory};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (SnidErrorCategory::UsageError, 2, "UsageError"),
            (SnidErrorCategory::IoSystemError, 3, "IoSystemError"),
            (SnidErrorCategory::ToolExecutionError, 4, "ToolExecutionError"),
            (SnidErrorCategory::OutputFormatError, 5, "OutputFormatError"),
        ];

        for (category, exit_code, label) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.label(), label);
        }
    }

    #[test]
    fn diagnostic_line_carries_placeholder_and_message() {
        let error = SnidError::usage("INPUT.DISPATCH_MODE", "unknown dispatch mode 'eager'");

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.DISPATCH_MODE] unknown dispatch mode 'eager'"
        );
        assert_eq!(
            error.to_string(),
            "UsageError [INPUT.DISPATCH_MODE] unknown dispatch mode 'eager'"
        );
    }
}
