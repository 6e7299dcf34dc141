use uuid::Uuid;

/// The verified identity a request acts as, derived from token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

/// Authorization predicates gating mutation endpoints. Pure functions of the
/// (optional) actor; side-effect free.
pub fn is_authenticated(actor: Option<&Actor>) -> bool {
    actor.is_some()
}

pub fn is_admin(actor: Option<&Actor>) -> bool {
    actor.map(|a| a.is_admin).unwrap_or(false)
}

/// Owner-or-admin rule used for booking mutations.
pub fn may_manage_booking(actor: &Actor, owner_id: Uuid) -> bool {
    actor.is_admin || actor.id == owner_id
}
