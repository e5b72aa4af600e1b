//! The anti-forgery token.

use rand::Rng;
use super::response::ActionResult;


//------------ Constants -----------------------------------------------------

/// The name of the reserved token action.
///
/// The router answers this action itself; the registry refuses to accept
/// a handler under this name.
pub const TOKEN_ACTION: &str = "gettoken";

/// The length of an issued token.
const TOKEN_LENGTH: usize = 40;

/// The characters a token is drawn from.
const TOKEN_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";


//------------ generate ------------------------------------------------------

/// Issues a fresh token as a JSON result.
///
/// The token is advisory only. Nothing in the server ever stores or
/// verifies it; the UI echoes it back with mutating requests to make
/// forging them from another site harder.
pub fn generate() -> ActionResult {
    ActionResult::json(new_token())
}

/// Produces a token drawn uniformly from the token alphabet.
fn new_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH).map(|_| {
        char::from(TOKEN_CHARS[rng.gen_range(0..TOKEN_CHARS.len())])
    }).collect()
}


//============ Tests =========================================================
