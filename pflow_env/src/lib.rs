//! pflow Environment Abstraction Layer
//!
//! This crate holds the collaborators a Track talks to while it is being
//! built, so that the entity itself never reaches for global detector state.
//!
//! # Core Concept: Injected Collaborators
//!
//! The reconstruction framework owns a single geometry description. Instead of
//! a process-wide singleton, every consumer receives a `FieldLookup` by
//! reference:
//! - **Production**: `SolenoidField` - inner/outer field of a solenoid magnet
//! - **Tests/Simulation**: `UniformField` - the same value everywhere
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use pflow_env::{FieldLookup, UniformField};
//!
//! let field = UniformField::new(3.5).unwrap();
//! let tesla = field.field_at(&Vector3::zeros()).unwrap();
//! assert_eq!(tesla, 3.5);
//! ```

mod field;
mod types;
mod error;
mod solenoid;

pub use field::FieldLookup;
pub use types::DetectorAddress;
pub use error::EnvError;
pub use solenoid::{SolenoidField, UniformField};
