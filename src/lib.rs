//! PlotModel Core - Declarative Plotting Model Engine
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Schemas Are Contracts
//! 2. Every Assignment Is Validated
//! 3. Transform Normalizes, Validate Gates
//! 4. Rejected Writes Change Nothing
//! 5. Wire Encoding Belongs To The Protocol Stage

pub mod document;
pub mod properties;
pub mod schema;
pub mod theme;
pub mod value;

pub use document::{Document, DocumentError, ModelInstance};
pub use properties::{PropertyDefault, PropertyDescriptor, PropertyKind, ValidationError};
pub use schema::{AttributeSpec, ModelSchema, SchemaBuilder, SchemaError, SchemaRegistry, SchemaSpec};
pub use theme::{Theme, ThemeError, ThemeSpec, ValueSource};
pub use value::{
    convert_date_to_datetime, is_datetime_type, is_timedelta_type, is_timestamp,
    parse_iso_datetime, Value,
};

pub const MODEL_VERSION: &str = env!("CARGO_PKG_VERSION");
