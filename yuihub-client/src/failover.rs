//! Header failover decisions.
//!
//! A logical call makes at most two attempts. The table below decides, from
//! the configured preference and the status of the attempt just made,
//! whether to finish or to try once more with the other header:
//!
//! | preference        | attempt | status    | next                    |
//! |-------------------|---------|-----------|-------------------------|
//! | `auto`            | first   | 401 / 403 | retry with other header |
//! | `auto`            | first   | other     | finish                  |
//! | `auto`            | retry   | any       | finish                  |
//! | explicit          | any     | any       | finish                  |

use yuihub_core::AuthHeaderPreference;

use crate::header::HeaderChoice;

/// Which attempt of a logical call was just made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// What to do after an attempt completed with a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Surface this response to the caller.
    Finish,
    /// Send again with the given header.
    Retry(HeaderChoice),
}

/// The header used on the first attempt.
pub fn initial_choice(preference: AuthHeaderPreference) -> HeaderChoice {
    match preference {
        AuthHeaderPreference::Token => HeaderChoice::Token,
        AuthHeaderPreference::Auto | AuthHeaderPreference::Authorization => {
            HeaderChoice::Authorization
        }
    }
}

pub fn is_auth_failure(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Decide the next step after `attempt`, sent with `used`, returned `status`.
pub fn next_step(
    preference: AuthHeaderPreference,
    attempt: Attempt,
    used: HeaderChoice,
    status: u16,
) -> Next {
    match (preference, attempt) {
        (AuthHeaderPreference::Auto, Attempt::First) if is_auth_failure(status) => {
            Next::Retry(used.alternate())
        }
        _ => Next::Finish,
    }
}
