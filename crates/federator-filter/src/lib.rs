//! Consumer attribute entitlement filtering.

pub mod filter;
pub mod label;

pub use filter::{AttributeFilter, FilterError, FilterRegistry, HeaderAttributeFilter};
pub use label::{parse_security_label, LabelError};
