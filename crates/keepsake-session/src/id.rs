//! Session id generation.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of ids produced by [`random_id`].
pub const ID_LENGTH: usize = 24;

/// Produces a new session id when an anonymous session needs one.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Generate a random 24 character alphanumeric id.
pub fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// The default generator, backed by [`random_id`].
pub fn default_generator() -> IdGenerator {
    Arc::new(random_id)
}
