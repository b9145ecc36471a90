use std::sync::atomic::{AtomicUsize, Ordering};

use crate::object::ObjectId;

// Single static counter for all canvas objects, so ids stay unique across sessions too
static NEXT_OBJECT_ID: AtomicUsize = AtomicUsize::new(1);

pub fn generate_id() -> ObjectId {
    ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::SeqCst))
}
