/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const REQUESTS_ROUTE_COMPONENT: &str = "requests";
pub const REQUESTS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", REQUESTS_ROUTE_COMPONENT);

pub const ROOMS_ROUTE_COMPONENT: &str = "rooms";
pub const ROOMS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", ROOMS_ROUTE_COMPONENT);

pub const UNREAD_ROUTE_COMPONENT: &str = "unread";

/// Header names used when identity is supplied by an upstream authenticator.
pub const DEFAULT_USER_ID_HEADER: &str = "x-user-id";
pub const DEFAULT_ROLE_HEADER: &str = "x-user-role";

/// Inclusive bounds accepted for a patient's age.
pub const PATIENT_AGE_MIN: i32 = 0;
pub const PATIENT_AGE_MAX: i32 = 150;
