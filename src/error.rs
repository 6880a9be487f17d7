//! Error types for the ivsurf library.
//!
//! Most per-quote failures are reported in-band (an unsolvable quote is
//! simply dropped), so the variants here cover the cases a caller actually
//! has to branch on: bad configuration, an empty surface, and numerical
//! failures inside an interpolation kernel.

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, IvSurfError>;

/// Errors that can occur while building an implied volatility surface.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IvSurfError {
    /// Input data or configuration is invalid (e.g. zero resolution, NaN spot).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Numerical computation failed (e.g. singular kriging system, NaN estimate).
    #[error("numerical error: {message}")]
    NumericalError { message: String },

    /// No surface can be built: no quotes, or none survived the solver.
    #[error("no surface available: {message}")]
    EmptySurface { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_message_accessible() {
        let err = IvSurfError::InvalidInput {
            message: "resolution must be positive".into(),
        };
        match &err {
            IvSurfError::InvalidInput { message } => {
                assert!(message.contains("positive"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn error_display_includes_message() {
        let err = IvSurfError::NumericalError {
            message: "singular kriging matrix".into(),
        };
        assert!(format!("{err}").contains("singular kriging matrix"));

        let err2 = IvSurfError::EmptySurface {
            message: "no quotes".into(),
        };
        let display = format!("{err2}");
        assert!(display.starts_with("no surface available"));
        assert!(display.contains("no quotes"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IvSurfError>();
    }
}
