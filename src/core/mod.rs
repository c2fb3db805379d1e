//! Core module - identity, storage, money and shop operations

pub mod config;
pub mod entity;
pub mod identity;
pub mod loader;
pub mod money;
pub mod project;
pub mod repository;
pub mod shop;
pub mod shortid;
pub mod totals;
pub mod workflow;

pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use repository::{MemoryRepository, Repository, RepositoryError, YamlRepository};
pub use shop::{Shop, ShopError, ShopSettings};
pub use shortid::ShortIdIndex;
pub use totals::{DiscountPolicy, Totals};
pub use workflow::{Lifecycle, WorkflowError};
