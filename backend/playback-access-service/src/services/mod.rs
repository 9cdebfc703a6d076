/// Business logic layer for playback-access-service
///
/// - **metadata**: cache-aside video metadata resolution
/// - **replay_guard**: one-time nonce consumption
/// - **access_grant**: time-bounded grants minted by delegated proofs
/// - **share_link**: public link issuance
/// - **authorization**: the decision engine tying the above together
pub mod access_grant;
pub mod authorization;
pub mod metadata;
pub mod replay_guard;
pub mod share_link;

pub use access_grant::{AccessGrantStore, GrantStatus};
pub use authorization::{AccessEngine, Decision, LinkSettings, ShareLink};
pub use metadata::MetadataResolver;
pub use replay_guard::{NonceOutcome, ReplayGuard};
pub use share_link::{ShareLinkIssuer, SignedLinkIssuer, StaticLinkIssuer};
