/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions to implement wait routines.

--*/

/// Evaluates `predicate` until it holds or `max_polls` evaluations have
/// failed. Returns whether the predicate held.
pub fn until<F>(max_polls: u32, mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..max_polls {
        if predicate() {
            return true;
        }
    }
    false
}
