//! Shared value model for the VideoCore IV compiler backend.
//!
//! This crate carries the pieces every backend stage agrees on:
//! - **Literals**: bit-reinterpretable 32-bit scalars
//! - **Half floats**: bit-exact IEEE 754 binary16 conversion
//! - **Data types**: scalar kind plus SIMD vector width
//! - **Values**: literal, container, small immediate, local, register,
//!   or the distinct undefined sentinel
//! - **Errors**: the structured compilation fault type

pub mod error;
pub mod half;
pub mod literal;
pub mod types;
pub mod value;

pub use error::{CompilationError, CompilationResult, CompilationStep};
pub use literal::Literal;
pub use types::{
    DataType, ScalarKind, TYPE_FLOAT, TYPE_HALF, TYPE_INT8, TYPE_INT16, TYPE_INT32, TYPE_INT64,
    TYPE_UNKNOWN,
};
pub use value::{
    ContainerValue, Local, LocalId, Register, RegisterFile, SmallImmediate, Value, ValueKind,
    FLOAT_INF, FLOAT_NAN, FLOAT_NEG_INF, FLOAT_ONE, FLOAT_ZERO, INT_ONE, INT_ZERO,
    REG_REPLICATE_ALL, REG_REPLICATE_QUAD, UNDEFINED_VALUE, VALUE_ALL_BITS_SET,
};

/// Hash map used on the compiler's hot paths.
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;
