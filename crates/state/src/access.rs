//! Role membership table and capability checks.
//!
//! The single `require` guard here is evaluated at the top of every
//! mutating operation, before any state change. Grant and revoke are
//! themselves gated on Admin, and the table refuses to drop its last
//! admin.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use agrotrace_types::{Address, LedgerError, Result, Role};

/// Role membership table.
///
/// Keyed by address; each address holds a set of roles. The deployer is
/// granted Admin at construction, and the table maintains the invariant
/// that at least one admin always exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    grants: BTreeMap<Address, BTreeSet<Role>>,
}

impl AccessControl {
    /// Creates a role table with `deployer` as the initial admin.
    pub fn new(deployer: Address) -> Self {
        let mut grants = BTreeMap::new();
        grants.insert(deployer, BTreeSet::from([Role::Admin]));
        Self { grants }
    }

    /// Pure lookup; always succeeds.
    pub fn has_role(&self, role: Role, address: &Address) -> bool {
        self.grants.get(address).is_some_and(|roles| roles.contains(&role))
    }

    /// Number of addresses currently holding Admin.
    pub fn admin_count(&self) -> usize {
        self.grants.values().filter(|roles| roles.contains(&Role::Admin)).count()
    }

    /// Capability check: the caller must hold at least one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] naming the accepted roles.
    pub fn require(&self, caller: &Address, allowed: &[Role]) -> Result<()> {
        if allowed.iter().any(|role| self.has_role(*role, caller)) {
            return Ok(());
        }
        Err(LedgerError::Unauthorized { address: caller.clone(), required: allowed.to_vec() })
    }

    /// Grants `role` to `address`. Admin only.
    ///
    /// Returns whether the table changed (granting an already-held role is
    /// a no-op, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if the caller is not an admin.
    pub fn grant(&mut self, caller: &Address, role: Role, address: &Address) -> Result<bool> {
        self.require(caller, &[Role::Admin])?;
        Ok(self.grants.entry(address.clone()).or_default().insert(role))
    }

    /// Revokes `role` from `address`. Admin only.
    ///
    /// Returns whether the table changed (revoking an unheld role is a
    /// no-op, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if the caller is not an admin,
    /// or [`LedgerError::LastAdmin`] if the revocation would leave zero
    /// admins; the table is untouched in both cases.
    pub fn revoke(&mut self, caller: &Address, role: Role, address: &Address) -> Result<bool> {
        self.require(caller, &[Role::Admin])?;
        if role == Role::Admin && self.has_role(Role::Admin, address) && self.admin_count() == 1 {
            return Err(LedgerError::LastAdmin { address: address.clone() });
        }
        let Some(roles) = self.grants.get_mut(address) else {
            return Ok(false);
        };
        let changed = roles.remove(&role);
        if roles.is_empty() {
            self.grants.remove(address);
        }
        Ok(changed)
    }

    /// All roles currently held by `address`, in declaration order.
    pub fn roles_of(&self, address: &Address) -> Vec<Role> {
        self.grants.get(address).map(|roles| roles.iter().copied().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn root() -> Address {
        Address::new("root")
    }

    #[test]
    fn deployer_starts_as_sole_admin() {
        let access = AccessControl::new(root());
        assert!(access.has_role(Role::Admin, &root()));
        assert_eq!(access.admin_count(), 1);
    }

    #[test]
    fn grant_requires_admin() {
        let mut access = AccessControl::new(root());
        let outsider = Address::new("mallory");
        let err = access
            .grant(&outsider, Role::Farmer, &Address::new("alice"))
            .expect_err("non-admin grant");
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(!access.has_role(Role::Farmer, &Address::new("alice")));
    }

    #[test]
    fn grant_and_revoke_roundtrip() {
        let mut access = AccessControl::new(root());
        let alice = Address::new("alice");
        assert!(access.grant(&root(), Role::Farmer, &alice).expect("grant"));
        assert!(access.has_role(Role::Farmer, &alice));
        // Second grant is a no-op.
        assert!(!access.grant(&root(), Role::Farmer, &alice).expect("regrant"));
        assert!(access.revoke(&root(), Role::Farmer, &alice).expect("revoke"));
        assert!(!access.has_role(Role::Farmer, &alice));
        // Revoking an unheld role is a no-op.
        assert!(!access.revoke(&root(), Role::Farmer, &alice).expect("re-revoke"));
    }

    #[test]
    fn addresses_may_hold_multiple_roles() {
        let mut access = AccessControl::new(root());
        let carol = Address::new("carol");
        access.grant(&root(), Role::Processor, &carol).expect("grant processor");
        access.grant(&root(), Role::Inspector, &carol).expect("grant inspector");
        assert_eq!(access.roles_of(&carol), vec![Role::Processor, Role::Inspector]);
    }

    #[test]
    fn sole_admin_cannot_self_revoke() {
        let mut access = AccessControl::new(root());
        let before = access.clone();
        let err = access.revoke(&root(), Role::Admin, &root()).expect_err("last admin");
        assert!(matches!(err, LedgerError::LastAdmin { .. }));
        // Role table unchanged.
        assert_eq!(access, before);
    }

    #[test]
    fn admin_can_step_down_once_replaced() {
        let mut access = AccessControl::new(root());
        let successor = Address::new("successor");
        access.grant(&root(), Role::Admin, &successor).expect("grant admin");
        assert!(access.revoke(&root(), Role::Admin, &root()).expect("step down"));
        assert_eq!(access.admin_count(), 1);
        assert!(!access.has_role(Role::Admin, &root()));
    }

    #[test]
    fn require_accepts_any_listed_role() {
        let mut access = AccessControl::new(root());
        let ines = Address::new("ines");
        access.grant(&root(), Role::Inspector, &ines).expect("grant");
        access.require(&ines, &[Role::Inspector, Role::Admin]).expect("inspector accepted");
        let err = access.require(&ines, &[Role::Farmer]).expect_err("farmer only");
        assert!(matches!(err, LedgerError::Unauthorized { required, .. } if required == vec![Role::Farmer]));
    }
}
