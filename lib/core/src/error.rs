//! Error handling foundation for flowsmith.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums in its own `error` module and wraps them in a rootcause
//! `Report` at the boundaries where resources are constructed.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
