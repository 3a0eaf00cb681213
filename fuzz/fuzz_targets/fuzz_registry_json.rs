#![no_main]

use libfuzzer_sys::fuzz_target;
use scoresync_registry::Registry;

// A malformed registry.json must never panic the deserializer, and any
// value that does parse must re-serialize without panicking either.
fuzz_target!(|data: &[u8]| {
    if let Ok(registry) = serde_json::from_slice::<Registry>(data) {
        let _ = serde_json::to_vec(&registry);
    }
});
