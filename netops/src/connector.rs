//! Session connector.
//!
//! Opens a device session with a bounded authentication retry. One-time
//! passwords are common on jump-managed devices, so a rejected password is
//! re-prompted instead of ending the run.

use std::io::Write;

use log::debug;

use crate::driver::Driver;
use crate::prompt::Prompter;

/// Total `open()` attempts per device, including the first one.
pub const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Open `driver`, re-prompting for the password on authentication failure.
///
/// Returns whether the session is open. Connectivity failures (refused,
/// timeout, host key) are not retried. Every failure is written to `out`.
pub async fn open_with_retry<D, P, W>(driver: &mut D, prompter: &mut P, out: &mut W) -> bool
where
    D: Driver,
    P: Prompter,
    W: Write,
{
    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        debug!("{}: connect attempt {}/{}", driver.host(), attempt, MAX_CONNECT_ATTEMPTS);
        match driver.open().await {
            Ok(()) => return true,
            Err(e) if e.is_auth_failure() => {
                report!(out, "Cannot authenticate: {}", e);
                if attempt == MAX_CONNECT_ATTEMPTS {
                    break;
                }
                match prompter.password("Password") {
                    Ok(password) => driver.set_password(password),
                    Err(e) => {
                        report!(out, "No password entered: {}", e);
                        return false;
                    }
                }
            }
            Err(e) => {
                report!(out, "Cannot connect to the device: {}", e);
                return false;
            }
        }
    }

    report!(
        out,
        "Giving up on {} after {} attempts",
        driver.host(),
        MAX_CONNECT_ATTEMPTS
    );
    false
}
