use ocilogs::Datasource;
use std::sync::Arc;

pub mod health;
pub mod query;
pub mod resources;

pub struct AppState {
    pub datasource: Arc<Datasource>,
}

pub use health::health;
pub use query::query;
pub use resources::list_resource;
