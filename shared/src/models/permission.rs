//! Permission Model
//!
//! Closed permission enum and a set type replacing `{ name: bool }` toggle maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

/// Permission (RBAC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Grants everything
    SuperAdmin,
    Authenticated,
    CreateCatalog,
    ReadCatalog,
    UpdateCatalog,
    DeleteCatalog,
    CreateCustomer,
    ReadCustomer,
    UpdateCustomer,
    DeleteCustomer,
    CreateOrder,
    ReadOrder,
    UpdateOrder,
    DeleteOrder,
    CreateSettings,
    ReadSettings,
    UpdateSettings,
    DeleteSettings,
}

impl Permission {
    pub const ALL: [Permission; 18] = [
        Permission::SuperAdmin,
        Permission::Authenticated,
        Permission::CreateCatalog,
        Permission::ReadCatalog,
        Permission::UpdateCatalog,
        Permission::DeleteCatalog,
        Permission::CreateCustomer,
        Permission::ReadCustomer,
        Permission::UpdateCustomer,
        Permission::DeleteCustomer,
        Permission::CreateOrder,
        Permission::ReadOrder,
        Permission::UpdateOrder,
        Permission::DeleteOrder,
        Permission::CreateSettings,
        Permission::ReadSettings,
        Permission::UpdateSettings,
        Permission::DeleteSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::SuperAdmin => "SuperAdmin",
            Permission::Authenticated => "Authenticated",
            Permission::CreateCatalog => "CreateCatalog",
            Permission::ReadCatalog => "ReadCatalog",
            Permission::UpdateCatalog => "UpdateCatalog",
            Permission::DeleteCatalog => "DeleteCatalog",
            Permission::CreateCustomer => "CreateCustomer",
            Permission::ReadCustomer => "ReadCustomer",
            Permission::UpdateCustomer => "UpdateCustomer",
            Permission::DeleteCustomer => "DeleteCustomer",
            Permission::CreateOrder => "CreateOrder",
            Permission::ReadOrder => "ReadOrder",
            Permission::UpdateOrder => "UpdateOrder",
            Permission::DeleteOrder => "DeleteOrder",
            Permission::CreateSettings => "CreateSettings",
            Permission::ReadSettings => "ReadSettings",
            Permission::UpdateSettings => "UpdateSettings",
            Permission::DeleteSettings => "DeleteSettings",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown permission name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Set of granted permissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Check whether this set grants the given permission (`SuperAdmin` grants all)
    pub fn grants(&self, permission: Permission) -> bool {
        self.contains(Permission::SuperAdmin) || self.contains(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build from a legacy toggle map, returning the names that were not recognised
    pub fn from_toggle_map(toggles: &HashMap<String, bool>) -> (Self, Vec<String>) {
        let mut set = Self::new();
        let mut unknown = Vec::new();
        for (name, enabled) in toggles {
            match name.parse::<Permission>() {
                Ok(p) if *enabled => {
                    set.insert(p);
                }
                Ok(_) => {}
                Err(_) => unknown.push(name.clone()),
            }
        }
        unknown.sort();
        (set, unknown)
    }

    /// Full toggle map over every known permission
    pub fn to_toggle_map(&self) -> BTreeMap<&'static str, bool> {
        Permission::ALL
            .iter()
            .map(|p| (p.as_str(), self.contains(*p)))
            .collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let p: Permission = "UpdateCatalog".parse().unwrap();
        assert_eq!(p, Permission::UpdateCatalog);
        assert_eq!(p.to_string(), "UpdateCatalog");
        assert!("Fly".parse::<Permission>().is_err());
    }

    #[test]
    fn test_super_admin_grants_all() {
        let set: PermissionSet = [Permission::SuperAdmin].into_iter().collect();
        assert!(set.grants(Permission::DeleteOrder));

        let set: PermissionSet = [Permission::ReadCatalog].into_iter().collect();
        assert!(set.grants(Permission::ReadCatalog));
        assert!(!set.grants(Permission::UpdateCatalog));
    }

    #[test]
    fn test_toggle_map_conversion() {
        let mut toggles = HashMap::new();
        toggles.insert("ReadCatalog".to_string(), true);
        toggles.insert("UpdateCatalog".to_string(), false);
        toggles.insert("LegacyThing".to_string(), true);

        let (set, unknown) = PermissionSet::from_toggle_map(&toggles);
        assert_eq!(set.len(), 1);
        assert!(set.contains(Permission::ReadCatalog));
        assert_eq!(unknown, vec!["LegacyThing".to_string()]);

        let map = set.to_toggle_map();
        assert_eq!(map.len(), Permission::ALL.len());
        assert_eq!(map["ReadCatalog"], true);
        assert_eq!(map["UpdateCatalog"], false);
    }

    #[test]
    fn test_serde_as_list() {
        let set: PermissionSet = [Permission::ReadOrder, Permission::Authenticated]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!(["Authenticated", "ReadOrder"]));
    }
}
