use crate::client::resolver::ResolvedRole;
use crate::models::user::Role;

/// The admin back-office landing route.
pub const ADMIN_HOME: &str = "/admin";
/// The technician workbench landing route.
pub const TECHNICIAN_HOME: &str = "/technician";
/// The customer dashboard, also the safe fallback destination.
pub const CUSTOMER_DASHBOARD: &str = "/dashboard";

/// Maps a resolved role to its post-login landing path.
///
/// Pure and idempotent. An unresolved role always lands on the customer
/// dashboard — never on an admin route.
pub fn landing_path(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::SuperAdmin) | Some(Role::Admin) => ADMIN_HOME,
        Some(Role::Technician) => TECHNICIAN_HOME,
        Some(Role::Customer) | None => CUSTOMER_DASHBOARD,
    }
}

/// Convenience for routing straight off a resolution outcome.
pub fn landing_for(resolved: &ResolvedRole) -> &'static str {
    landing_path(Some(resolved.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::resolver::RoleSource;

    #[test]
    fn admin_tiers_land_on_the_back_office() {
        assert_eq!(landing_path(Some(Role::SuperAdmin)), ADMIN_HOME);
        assert_eq!(landing_path(Some(Role::Admin)), ADMIN_HOME);
    }

    #[test]
    fn technicians_land_on_the_workbench() {
        assert_eq!(landing_path(Some(Role::Technician)), TECHNICIAN_HOME);
    }

    #[test]
    fn customers_and_unresolved_land_on_the_dashboard() {
        assert_eq!(landing_path(Some(Role::Customer)), CUSTOMER_DASHBOARD);
        assert_eq!(landing_path(None), CUSTOMER_DASHBOARD);
    }

    #[test]
    fn unresolved_never_reaches_an_admin_route() {
        assert_ne!(landing_path(None), ADMIN_HOME);
        assert_ne!(landing_path(None), TECHNICIAN_HOME);
    }

    #[test]
    fn fallback_resolution_routes_to_the_dashboard() {
        let resolved = ResolvedRole {
            role: Role::Customer,
            source: RoleSource::Fallback,
            attempts: 8,
        };
        assert_eq!(landing_for(&resolved), CUSTOMER_DASHBOARD);
    }
}
