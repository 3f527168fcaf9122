use proptest::prelude::*;

/// Strategy for generating dotted event names like `order.created`
pub fn event_name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}\\.[a-z]{1,12}"
}

/// Strategy for generating listener counts per event
pub fn listener_count_strategy() -> impl Strategy<Value = usize> {
    0usize..16
}

/// Strategy for generating how many times an event is dispatched
pub fn dispatch_count_strategy() -> impl Strategy<Value = usize> {
    1usize..5
}
