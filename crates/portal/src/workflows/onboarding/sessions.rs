use super::domain::Identity;

/// Bearer-token session handling, kept behind a trait so the completion
/// workflow never learns how tokens are minted or stored. Authentication
/// proper (password checks) lives in the onboarding service; everything
/// after the token is the host's concern.
pub trait SessionStore: Send + Sync {
    /// Mints a token for the identity and remembers the association.
    fn issue(&self, identity: Identity) -> String;

    /// Resolves a previously issued token; `None` once revoked or unknown.
    fn resolve(&self, token: &str) -> Option<Identity>;

    fn revoke(&self, token: &str);
}
