use time::OffsetDateTime;
use time::macros::datetime;

/// The zero instant (`0001-01-01T00:00:00Z`). A timestamp at or before it
/// counts as "not supplied" when merging entry updates.
pub const ZERO_TIMESTAMP: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
