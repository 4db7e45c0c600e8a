pub mod clock;
pub mod id;
pub mod model;
pub mod reconcile;

pub use clock::{ZERO_TIMESTAMP, now_utc};
pub use id::{NEW_ENTRY_ID, generate_id, needs_generated_id};
pub use model::{Ambulance, Condition, WaitingListEntry, WaitingListEntryInput};
pub use reconcile::reconcile_waiting_list;
