// Domain-layer modules and shared errors/models
pub mod prospector {
    pub use crate::prospector::*;
}

pub mod dashboard_state {
    pub use crate::dashboard_state::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
