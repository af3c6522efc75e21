use crate::domain::DomainError;

/// Ownership check shared by every resource type. No role overrides.
pub fn is_owner(actor_id: i64, resource_owner_id: i64) -> bool {
    actor_id == resource_owner_id
}

pub fn ensure_owner(actor_id: i64, resource_owner_id: i64) -> Result<(), DomainError> {
    if is_owner(actor_id, resource_owner_id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_strict_equality() {
        assert!(is_owner(7, 7));
        assert!(!is_owner(7, 8));
        assert!(matches!(ensure_owner(1, 2), Err(DomainError::Forbidden)));
        assert!(ensure_owner(2, 2).is_ok());
    }
}
