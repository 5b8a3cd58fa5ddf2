use serial_test::serial;

// Both tests mutate the process-global subscriber, so they must not run
// concurrently with each other.

#[test]
#[serial]
fn init_is_idempotent() {
    tileboard::logging::init(false);
    tileboard::logging::init(false);
}

#[test]
#[serial]
fn init_with_debug_does_not_panic() {
    tileboard::logging::init(true);
}
