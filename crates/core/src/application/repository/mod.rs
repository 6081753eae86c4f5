// Job repositories: bundled in-memory backend and the startup router

mod in_memory;
mod router;

pub use in_memory::InMemoryJobRepository;
pub use router::{JobRepositoryRouter, RepositoryConfig, RepositoryRegistry, IN_MEMORY};
