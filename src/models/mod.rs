pub mod batch;
pub mod document;
pub mod enums;
pub mod note;
pub mod patient;
pub mod timeline;

pub use batch::*;
pub use document::*;
pub use enums::*;
pub use note::*;
pub use patient::*;
pub use timeline::*;

use uuid::Uuid;

/// Generate a prefixed short identifier, e.g. `BATCH_3FA85F64`.
///
/// Short ids are what nurses read back over the phone, so they stay
/// uppercase and eight characters.
pub fn new_entity_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, hex[..8].to_uppercase())
}
