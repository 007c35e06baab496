//! Record visibility and write rights per caller
//!
//! A caller holds zero or more roles (staff, driver, customer). Each
//! `(entity kind, role, action)` maps to a [`Scope`]; a record is visible
//! when it falls inside the scope of at least one of the caller's roles.
//!
//! | kind     | staff | driver                       | customer                 | anonymous     |
//! |----------|-------|------------------------------|--------------------------|---------------|
//! | driver   | all   | self                         | -                        | -             |
//! | vehicle  | all   | operated vehicle             | -                        | -             |
//! | customer | all   | -                            | self                     | -             |
//! | route    | all   | driven routes                | routes with own delivery | -             |
//! | delivery | all   | on driven routes or assigned | own                      | tracking code |

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use entregas_store::Records;
use entregas_types::{Action, Entity, EntityKind, Error, Result, RouteId};

use crate::model::{Customer, Delivery, Driver, Route, Vehicle};

/// Identity attached to an authenticated caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub staff: bool,
    /// Tax id of the driver this caller is
    #[serde(default)]
    pub driver: Option<String>,
    /// Tax id of the customer this caller is
    #[serde(default)]
    pub customer: Option<String>,
}

impl Principal {
    pub fn staff() -> Self {
        Self {
            staff: true,
            ..Self::default()
        }
    }

    pub fn driver(tax_id: impl Into<String>) -> Self {
        Self {
            driver: Some(tax_id.into()),
            ..Self::default()
        }
    }

    pub fn customer(tax_id: impl Into<String>) -> Self {
        Self {
            customer: Some(tax_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Principal),
}

impl Caller {
    pub fn staff() -> Self {
        Caller::Authenticated(Principal::staff())
    }

    pub fn driver(tax_id: impl Into<String>) -> Self {
        Caller::Authenticated(Principal::driver(tax_id))
    }

    pub fn customer(tax_id: impl Into<String>) -> Self {
        Caller::Authenticated(Principal::customer(tax_id))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Caller::Anonymous)
    }

    pub fn roles(&self) -> Vec<Role> {
        match self {
            Caller::Anonymous => vec![Role::Anonymous],
            Caller::Authenticated(p) => {
                let mut roles = Vec::new();
                if p.staff {
                    roles.push(Role::Staff);
                }
                if p.driver.is_some() {
                    roles.push(Role::Driver);
                }
                if p.customer.is_some() {
                    roles.push(Role::Customer);
                }
                roles
            }
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Anonymous => write!(f, "anonymous"),
            Caller::Authenticated(p) => {
                let mut parts = Vec::new();
                if p.staff {
                    parts.push("staff".to_string());
                }
                if let Some(d) = &p.driver {
                    parts.push(format!("driver:{}", d));
                }
                if let Some(c) = &p.customer {
                    parts.push(format!("customer:{}", c));
                }
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Parses `anonymous`, or a comma separated list of `staff`, `driver:<tax id>`
/// and `customer:<tax id>`
impl FromStr for Caller {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("anonymous") {
            return Ok(Caller::Anonymous);
        }

        let mut principal = Principal::default();
        for part in s.split(',').map(str::trim) {
            match part.split_once(':') {
                None if part.eq_ignore_ascii_case("staff") => principal.staff = true,
                Some((role, id)) if role.eq_ignore_ascii_case("driver") && !id.is_empty() => {
                    principal.driver = Some(id.to_string())
                }
                Some((role, id)) if role.eq_ignore_ascii_case("customer") && !id.is_empty() => {
                    principal.customer = Some(id.to_string())
                }
                _ => {
                    return Err(Error::Validation(format!(
                        "unknown caller '{}', expected staff, driver:<tax id> or customer:<tax id>",
                        part
                    )))
                }
            }
        }
        Ok(Caller::Authenticated(principal))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Staff,
    Driver,
    Customer,
    Anonymous,
}

/// Subset of records of one kind that a role may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everything,
    Nothing,
    /// The driver record of the caller
    SelfDriver,
    /// The vehicle the calling driver currently operates
    OperatedVehicle,
    /// The customer record of the caller
    SelfCustomer,
    /// Routes the calling driver drives
    DrivenRoutes,
    /// Routes carrying at least one delivery of the calling customer
    RoutesWithOwnDeliveries,
    /// Deliveries on a driven route or assigned to the calling driver
    DeliveriesOnDrivenRoutes,
    /// Deliveries of the calling customer
    OwnDeliveries,
    /// Deliveries assigned to the calling driver
    AssignedToSelf,
    /// The single delivery whose tracking code was supplied
    TrackingCode,
}

/// Caller independent knobs of the access rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Let customers create deliveries for themselves
    #[serde(default)]
    pub customers_create_deliveries: bool,
}

pub const fn read_scope(kind: EntityKind, role: Role) -> Scope {
    use EntityKind as K;
    match (kind, role) {
        (_, Role::Staff) => Scope::Everything,
        (K::Driver, Role::Driver) => Scope::SelfDriver,
        (K::Vehicle, Role::Driver) => Scope::OperatedVehicle,
        (K::Route, Role::Driver) => Scope::DrivenRoutes,
        (K::Delivery, Role::Driver) => Scope::DeliveriesOnDrivenRoutes,
        (K::Customer, Role::Customer) => Scope::SelfCustomer,
        (K::Route, Role::Customer) => Scope::RoutesWithOwnDeliveries,
        (K::Delivery, Role::Customer) => Scope::OwnDeliveries,
        (K::Delivery, Role::Anonymous) => Scope::TrackingCode,
        _ => Scope::Nothing,
    }
}

pub fn write_scope(kind: EntityKind, role: Role, action: Action, policy: &AccessPolicy) -> Scope {
    match (kind, role, action) {
        (_, Role::Staff, _) => Scope::Everything,
        (EntityKind::Delivery, Role::Driver, Action::Update) => Scope::AssignedToSelf,
        (EntityKind::Delivery, Role::Customer, Action::Create)
            if policy.customers_create_deliveries =>
        {
            Scope::OwnDeliveries
        }
        _ => Scope::Nothing,
    }
}

pub fn scope_for(kind: EntityKind, role: Role, action: Action, policy: &AccessPolicy) -> Scope {
    match action {
        Action::Read => read_scope(kind, role),
        _ => write_scope(kind, role, action, policy),
    }
}

/// Facts about the caller needed to evaluate scopes without further lookups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeContext {
    pub driver: Option<String>,
    pub customer: Option<String>,
    pub driven_routes: BTreeSet<RouteId>,
    pub customer_routes: BTreeSet<RouteId>,
    pub tracking_code: Option<String>,
}

impl ScopeContext {
    fn is_driver(&self, tax_id: &str) -> bool {
        self.driver.as_deref() == Some(tax_id)
    }

    fn is_customer(&self, tax_id: &str) -> bool {
        self.customer.as_deref() == Some(tax_id)
    }
}

/// Records that can be tested against a [`Scope`]
pub trait Scoped: Entity {
    /// Membership for the narrowed scopes; `Everything` and `Nothing` never
    /// reach this method
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool;
}

impl Scoped for Driver {
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool {
        scope == Scope::SelfDriver && ctx.is_driver(&self.tax_id)
    }
}

impl Scoped for Vehicle {
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool {
        match (scope, &self.active_driver) {
            (Scope::OperatedVehicle, Some(driver)) => ctx.is_driver(driver),
            _ => false,
        }
    }
}

impl Scoped for Customer {
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool {
        scope == Scope::SelfCustomer && ctx.is_customer(&self.tax_id)
    }
}

impl Scoped for Route {
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool {
        match scope {
            Scope::DrivenRoutes => ctx.is_driver(&self.driver),
            Scope::RoutesWithOwnDeliveries => ctx.customer_routes.contains(&self.id),
            _ => false,
        }
    }
}

impl Scoped for Delivery {
    fn in_scope(&self, scope: Scope, ctx: &ScopeContext) -> bool {
        let assigned = self.driver.as_deref().is_some_and(|d| ctx.is_driver(d));
        match scope {
            Scope::DeliveriesOnDrivenRoutes => {
                assigned || self.route.is_some_and(|r| ctx.driven_routes.contains(&r))
            }
            Scope::AssignedToSelf => assigned,
            Scope::OwnDeliveries => ctx.is_customer(&self.customer),
            Scope::TrackingCode => ctx.tracking_code.as_deref() == Some(self.tracking_code.as_str()),
            _ => false,
        }
    }
}

/// Access rules resolved for one caller
#[derive(Debug, Clone)]
pub struct AccessScope {
    caller: Caller,
    policy: AccessPolicy,
    ctx: ScopeContext,
}

impl AccessScope {
    /// Look up the routes the caller drives and the routes carrying the
    /// caller's deliveries
    pub fn resolve<R: Records>(tx: &R, caller: &Caller, policy: AccessPolicy) -> Result<Self> {
        let mut ctx = ScopeContext::default();
        if let Caller::Authenticated(principal) = caller {
            if let Some(driver) = &principal.driver {
                ctx.driven_routes = tx
                    .filter(|r: &Route| &r.driver == driver)?
                    .into_iter()
                    .map(|r| r.id)
                    .collect();
                ctx.driver = Some(driver.clone());
            }
            if let Some(customer) = &principal.customer {
                ctx.customer_routes = tx
                    .filter(|d: &Delivery| &d.customer == customer)?
                    .into_iter()
                    .filter_map(|d| d.route)
                    .collect();
                ctx.customer = Some(customer.clone());
            }
        }

        debug!(
            caller = %caller,
            driven_routes = ctx.driven_routes.len(),
            customer_routes = ctx.customer_routes.len(),
            "resolved access scope"
        );
        Ok(Self {
            caller: caller.clone(),
            policy,
            ctx,
        })
    }

    /// Add the tracking code an anonymous lookup was made with
    pub fn with_tracking_code(mut self, code: impl Into<String>) -> Self {
        self.ctx.tracking_code = Some(code.into());
        self
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn context(&self) -> &ScopeContext {
        &self.ctx
    }

    pub fn permits<E: Scoped>(&self, action: Action, record: &E) -> bool {
        self.caller
            .roles()
            .into_iter()
            .any(|role| match scope_for(E::KIND, role, action, &self.policy) {
                Scope::Everything => true,
                Scope::Nothing => false,
                scope => record.in_scope(scope, &self.ctx),
            })
    }

    pub fn can_read<E: Scoped>(&self, record: &E) -> bool {
        self.permits(Action::Read, record)
    }

    /// Whether any record of `kind` could be permitted for `action`
    pub fn may(&self, action: Action, kind: EntityKind) -> bool {
        self.caller
            .roles()
            .into_iter()
            .any(|role| scope_for(kind, role, action, &self.policy) != Scope::Nothing)
    }

    /// The rejection for a denied action: `Unauthenticated` for anonymous
    /// callers, `Forbidden` otherwise
    pub fn denied(&self, action: Action, kind: EntityKind) -> Error {
        if self.caller.is_anonymous() {
            Error::Unauthenticated
        } else {
            Error::Forbidden { action, kind }
        }
    }

    pub fn authorize<E: Scoped>(&self, action: Action, record: &E) -> Result<()> {
        if self.permits(action, record) {
            Ok(())
        } else {
            debug!(caller = %self.caller, %action, kind = %E::KIND, key = %record.key(), "access denied");
            Err(self.denied(action, E::KIND))
        }
    }

    /// Fails unless `action` is possible on at least some records of `kind`
    pub fn authorize_kind(&self, action: Action, kind: EntityKind) -> Result<()> {
        if self.may(action, kind) {
            Ok(())
        } else {
            Err(self.denied(action, kind))
        }
    }

    /// Listing needs an identity; anonymous callers only look records up by
    /// tracking code
    pub fn authorize_list(&self, kind: EntityKind) -> Result<()> {
        if self.caller.is_anonymous() {
            return Err(Error::Unauthenticated);
        }
        self.authorize_kind(Action::Read, kind)
    }

    /// Keep only readable records
    pub fn visible<E: Scoped>(&self, records: Vec<E>) -> Vec<E> {
        records.into_iter().filter(|r| self.can_read(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, delivery};
    use entregas_store::{EntityStore, JsonStore};
    use entregas_types::{LicenseClass, VehicleCategory};

    /// Two drivers on two routes; customer 900 has a delivery on route 1,
    /// customer 901 on route 2
    fn seeded() -> JsonStore {
        let store = JsonStore::in_memory();
        store
            .transaction(|tx| {
                tx.create(Driver::new("100", "Ana", LicenseClass::E, date(1)))?;
                tx.create(Driver::new("200", "Bruno", LicenseClass::E, date(1)))?;
                let mut van = Vehicle::new("VAN0001", "Master", VehicleCategory::Van, 50);
                van.active_driver = Some("100".to_string());
                tx.create(van)?;
                tx.create(Vehicle::new("VAN0002", "Master", VehicleCategory::Van, 50))?;
                tx.create(Customer::new("900", "Loja Azul"))?;
                tx.create(Customer::new("901", "Mercado Sol"))?;
                tx.create(Route::new(RouteId(1), "norte", "100", "VAN0001", date(2)))?;
                tx.create(Route::new(RouteId(2), "sul", "200", "VAN0002", date(2)))?;

                let mut own = delivery("AZ1", "900", 5);
                own.route = Some(RouteId(1));
                tx.create(own)?;
                let mut other = delivery("SOL1", "901", 5);
                other.route = Some(RouteId(2));
                tx.create(other)?;
                let mut assigned = delivery("SOL2", "901", 5);
                assigned.route = Some(RouteId(2));
                assigned.driver = Some("100".to_string());
                tx.create(assigned)?;
                Ok(())
            })
            .unwrap();
        store
    }

    fn scope(store: &JsonStore, caller: Caller) -> AccessScope {
        store
            .read(|tx| AccessScope::resolve(tx, &caller, AccessPolicy::default()))
            .unwrap()
    }

    fn codes(deliveries: Vec<Delivery>) -> Vec<String> {
        deliveries.into_iter().map(|d| d.tracking_code).collect()
    }

    #[test]
    fn test_customer_sees_only_own_delivery() {
        let store = seeded();
        let access = scope(&store, Caller::customer("900"));
        let all: Vec<Delivery> = store.read(|tx| tx.all()).unwrap();
        assert_eq!(codes(access.visible(all)), vec!["AZ1"]);

        let foreign: Delivery = store.read(|tx| tx.get("SOL1")).unwrap();
        let err = access.authorize(Action::Read, &foreign).unwrap_err();
        assert!(matches!(
            err,
            Error::Forbidden {
                action: Action::Read,
                kind: EntityKind::Delivery
            }
        ));
    }

    #[test]
    fn test_customer_sees_routes_with_own_deliveries() {
        let store = seeded();
        let access = scope(&store, Caller::customer("900"));
        let routes: Vec<Route> = store.read(|tx| tx.all()).unwrap();
        let ids: Vec<RouteId> = access.visible(routes).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RouteId(1)]);

        let drivers: Vec<Driver> = store.read(|tx| tx.all()).unwrap();
        assert!(access.visible(drivers).is_empty());
        assert!(matches!(
            access.authorize_kind(Action::Read, EntityKind::Driver),
            Err(Error::Forbidden { .. })
        ));
    }

    #[test]
    fn test_driver_scope() {
        let store = seeded();
        let access = scope(&store, Caller::driver("100"));

        let all: Vec<Delivery> = store.read(|tx| tx.all()).unwrap();
        // AZ1 is on a driven route, SOL2 is assigned directly
        assert_eq!(codes(access.visible(all)), vec!["AZ1", "SOL2"]);

        let vehicles: Vec<Vehicle> = store.read(|tx| tx.all()).unwrap();
        let plates: Vec<String> = access.visible(vehicles).into_iter().map(|v| v.plate).collect();
        assert_eq!(plates, vec!["VAN0001"]);

        let drivers: Vec<Driver> = store.read(|tx| tx.all()).unwrap();
        assert_eq!(access.visible(drivers).len(), 1);
    }

    #[test]
    fn test_driver_updates_only_assigned_deliveries() {
        let store = seeded();
        let access = scope(&store, Caller::driver("100"));
        let (az1, sol2): (Delivery, Delivery) = store
            .read(|tx| Ok((tx.get("AZ1")?, tx.get("SOL2")?)))
            .unwrap();

        assert!(access.authorize(Action::Update, &sol2).is_ok());
        assert!(access.authorize(Action::Update, &az1).is_err());
        assert!(access.authorize(Action::Delete, &sol2).is_err());
    }

    #[test]
    fn test_anonymous_tracking_lookup() {
        let store = seeded();
        let anonymous = scope(&store, Caller::Anonymous);
        let az1: Delivery = store.read(|tx| tx.get("AZ1")).unwrap();

        assert!(matches!(
            anonymous.authorize(Action::Read, &az1),
            Err(Error::Unauthenticated)
        ));
        let tracked = anonymous.clone().with_tracking_code("AZ1");
        assert!(tracked.can_read(&az1));

        let sol1: Delivery = store.read(|tx| tx.get("SOL1")).unwrap();
        assert!(!tracked.can_read(&sol1));

        assert!(matches!(
            anonymous.authorize_list(EntityKind::Delivery),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_staff_and_combined_roles() {
        let store = seeded();
        let staff = scope(&store, Caller::staff());
        let all: Vec<Delivery> = store.read(|tx| tx.all()).unwrap();
        assert_eq!(staff.visible(all.clone()).len(), 3);
        assert!(staff.authorize(Action::Delete, &all[0]).is_ok());

        let both: Caller = "driver:200,customer:900".parse().unwrap();
        let access = scope(&store, both);
        assert_eq!(codes(access.visible(all)), vec!["AZ1", "SOL1", "SOL2"]);
    }

    #[test]
    fn test_customer_create_follows_policy() {
        let store = seeded();
        let own = delivery("AZ2", "900", 3);

        let closed = scope(&store, Caller::customer("900"));
        assert!(closed.authorize(Action::Create, &own).is_err());

        let open = store
            .read(|tx| {
                AccessScope::resolve(
                    tx,
                    &Caller::customer("900"),
                    AccessPolicy {
                        customers_create_deliveries: true,
                    },
                )
            })
            .unwrap();
        assert!(open.authorize(Action::Create, &own).is_ok());
        assert!(open
            .authorize(Action::Create, &delivery("SOL9", "901", 3))
            .is_err());
    }

    #[test]
    fn test_caller_parsing() {
        assert_eq!("anonymous".parse::<Caller>().unwrap(), Caller::Anonymous);
        assert_eq!("staff".parse::<Caller>().unwrap(), Caller::staff());
        let caller: Caller = "staff, driver:100".parse().unwrap();
        assert_eq!(caller.roles(), vec![Role::Staff, Role::Driver]);
        assert_eq!(caller.to_string(), "staff,driver:100");
        assert!("driver:".parse::<Caller>().is_err());
        assert!("admin".parse::<Caller>().is_err());
    }
}
