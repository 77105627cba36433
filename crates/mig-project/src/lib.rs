//! Project model for schema-generation migrations
//!
//! Provides:
//! - Directory scan into a [`Project`] of parsed configuration documents
//! - Build descriptor with an identity-deduplicated [`DependencyModel`]
//! - Namespace registration and bridging, idempotent per document
//! - API contract loading behind the [`ContractParser`] seam, memoized per run

pub mod contract;
pub mod error;
pub mod namespaces;
pub mod pom;
pub mod project;
pub mod project_type;

pub use contract::{ApiContract, ContractParser, Method, Resource, YamlContractParser};
pub use error::{ContractError, ProjectError, ProjectLoadError};
pub use namespaces::{NamespaceRegistry, SchemaLocations};
pub use pom::{BuildDescriptor, Dependency, DependencyKey, DependencyModel};
pub use project::{Project, ProjectBuilder};
pub use project_type::{ProjectType, UnknownProjectType};
