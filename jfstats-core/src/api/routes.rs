macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned route table shared by the server and its tests.
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub const HEALTH: &str = v1_path!("/health");

    pub mod servers {
        pub const COLLECTION: &str = v1_path!("/servers");
        pub const SYNC: &str = v1_path!("/servers/{id}/sync");
        pub const SYNC_STATUS: &str = v1_path!("/servers/{id}/sync/status");
        pub const SYNC_RESET: &str = v1_path!("/servers/{id}/sync/reset");
        pub const ACTIVE_SESSIONS: &str = v1_path!("/servers/{id}/sessions/active");
        pub const EXPORT: &str = v1_path!("/servers/{id}/export");
    }

    pub mod sync {
        pub const SWEEP: &str = v1_path!("/sync/sweep");
    }

    pub mod import {
        pub const JELLYSTATS: &str = v1_path!("/import/jellystats");
        pub const LEGACY: &str = v1_path!("/import/legacy");
        pub const PLAYBACK_REPORTING: &str = v1_path!("/import/playback-reporting");
    }
}

pub mod utils {
    /// Replace a single path parameter (e.g. `{id}`).
    pub fn replace_param(route: &str, param: &str, value: impl AsRef<str>) -> String {
        route.replace(param, value.as_ref())
    }

    /// Append query parameters to the provided route.
    pub fn with_query(route: &str, params: &[(&str, &str)]) -> String {
        if params.is_empty() {
            return route.to_string();
        }
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("{route}?{}", query.join("&"))
    }
}
