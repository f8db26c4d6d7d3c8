//! Route paths served by the API router.

pub const GET_HEALTHCHECK: &str = "/healthcheck";

pub const POST_API_USERS: &str = "/api/users";
pub const GET_API_ME: &str = "/api/me";

/// Login (`POST`), list (`GET`) and logout (`DELETE`) share one path.
pub const API_SESSIONS: &str = "/api/sessions";

pub const GET_API_SESSIONS_OAUTH_GOOGLE: &str = "/api/sessions/oauth/google";
pub const GET_API_SESSIONS_OAUTH_URL: &str = "/api/sessions/oauth/url";

/// Path on the frontend origin that federated logins land on after a failure.
pub const OAUTH_ERROR_PATH: &str = "/oauth/error";
