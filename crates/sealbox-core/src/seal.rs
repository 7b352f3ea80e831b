//! Import, sanitize and grant.
//!
//! Shared by the send and reply paths. Every submitted payload goes through
//! the same engine call sequence whatever its value, so execution never
//! depends on the plaintext:
//!
//! ```text
//! import_verified(input, proof)      -> imported
//! encrypted_equals(imported, zero)   -> is_zero
//! encrypted_select(is_zero, zero, imported)
//! discard(is_zero), discard(imported)
//! ```
//!
//! A zero input comes out as the canonical zero value, anything else comes
//! out with its value preserved.

use crate::{
    engine::{CryptoEngine, InputContext},
    error::RelayError,
    handle::{ExternalInput, Handle, InputProof},
    identity::Identity,
};

/// Imports and sanitizes one client input.
///
/// The imported handle and the comparison result are discarded once the
/// sanitized handle exists; only the returned handle outlives this call.
pub(crate) fn seal_input<G: CryptoEngine>(
    engine: &mut G,
    input: &ExternalInput,
    proof: &InputProof,
    context: InputContext<'_>,
) -> Result<Handle, RelayError> {
    let imported = engine.import_verified(input, proof, context)?;
    let sealed = sanitize(engine, imported);
    engine.discard(imported);

    let sealed = sealed?;
    tracing::trace!(?sealed, "sealed client input");
    Ok(sealed)
}

fn sanitize<G: CryptoEngine>(engine: &mut G, imported: Handle) -> Result<Handle, RelayError> {
    let zero = engine.canonical_zero();
    let is_zero = engine.encrypted_equals(imported, zero)?;
    let sealed = engine.encrypted_select(is_zero, zero, imported);
    engine.discard(is_zero.0);
    sealed.map_err(RelayError::from)
}

/// Grants decrypt rights on `handle` to the relay and to both parties.
pub(crate) fn grant_parties<G: CryptoEngine>(
    engine: &mut G,
    handle: Handle,
    sender: &Identity,
    recipient: &Identity,
) {
    engine.grant_self_access(handle);
    engine.grant_permanent_access(handle, sender);
    engine.grant_permanent_access(handle, recipient);
}
