// Helpers for generating record IDs.
//
// Sessions use UUIDv7 so that listings sort by creation time without an
// extra index. Identities use random v4 IDs, matching PG's
// gen_random_uuid() default on the `identities` table.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable), used for session IDs.
pub fn session_id() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new random UUIDv4, used for identity IDs.
pub fn identity_id() -> Uuid {
    Uuid::new_v4()
}
