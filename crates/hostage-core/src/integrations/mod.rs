pub mod notion;
pub mod traits;

pub use notion::NotionTaskSource;
pub use traits::{ExternalTask, ExternalTaskSource};
