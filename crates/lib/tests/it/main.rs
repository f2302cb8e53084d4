/*! Integration tests for Portcullis.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the flows the library guards:
 * - registration: account creation, validation, duplicate handling
 * - login: the authentication path and its refusal classes
 * - lockout: per-account failure counting and lockout expiry
 * - throttle: per-source rate limiting fed by the attempt ledger
 * - sessions: token issue, validation, revocation, expiry
 * - maintenance: the background sweep and the liveness probe
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("portcullis=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod lockout;
mod login;
mod maintenance;
mod registration;
mod throttle;
