//! External service integrations.

pub mod store_client {
    pub use crate::store_client::*;
}

pub mod ai_gateway {
    pub use crate::ai_gateway::*;
}

pub mod ai_models {
    pub use crate::ai_models::*;
}
