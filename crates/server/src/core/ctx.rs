use crate::core::auth::Role;
use crate::core::error::{Error, Result};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity resolved by `mw_require_auth` for the current request.
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: String,
    role: Role,
}

impl Ctx {
    pub fn new(user_id: String, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Owners and admins may mutate a resource.
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthFailCtxNotInRequestExt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_can_modify() {
        let owner = Ctx::new("u1".to_string(), Role::User);
        let admin = Ctx::new("a1".to_string(), Role::Admin);
        let other = Ctx::new("u2".to_string(), Role::User);

        assert!(owner.can_modify("u1"));
        assert!(admin.can_modify("u1"));
        assert!(!other.can_modify("u1"));
    }
}
