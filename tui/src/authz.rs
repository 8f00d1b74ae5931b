use shared::types::{Authored, Principal};

// ---------------------------------------------------------------------------
// Authorization policy
// ---------------------------------------------------------------------------
//
// Pure predicates over the principal's capability flags and resource
// ownership.  These gate which controls the UI offers; the service enforces
// the same rules on every request, so a stale UI can at worst trigger a
// server rejection, never an unauthorized write.

/// Publishing news requires a verified author or an admin.
pub fn can_create_news(principal: Option<&Principal>) -> bool {
    principal
        .map(|p| p.is_verified || p.is_admin)
        .unwrap_or(false)
}

/// Editing or deleting a resource requires being its author or an admin.
///
/// One rule for news and comments alike; no principal simply yields `false`.
pub fn can_modify<R: Authored>(principal: Option<&Principal>, resource: &R) -> bool {
    principal
        .map(|p| p.is_admin || p.id == resource.author_id())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
