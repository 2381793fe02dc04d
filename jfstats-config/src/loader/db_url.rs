use url::Url;

use super::ConfigLoadError;
use crate::sources::{EnvConfig, FileDatabaseConfig};

const DEFAULT_PG_PORT: u16 = 5432;

/// `DATABASE_URL` wins over `[database].url`, which wins over a URL built
/// from the libpq `PG*` variables.
pub fn resolve_database_url(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<String>, ConfigLoadError> {
    if let Some(url) = env.database_url.as_deref() {
        return validate("DATABASE_URL", url).map(Some);
    }

    if let Some(stored) = file_database
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        let mut parsed = validate_url("database.url", stored)?;
        if parsed.password().is_none()
            && let Some(password) = env.pg_password.as_deref()
        {
            parsed
                .set_password(Some(password))
                .map_err(|_| invalid("PGPASSWORD", "<redacted>", "cannot be encoded into a URL"))?;
        }
        return Ok(Some(parsed.to_string()));
    }

    from_pg_parts(env)
}

fn from_pg_parts(env: &EnvConfig) -> Result<Option<String>, ConfigLoadError> {
    let (Some(host), Some(database)) = (env.pg_host.as_deref(), env.pg_database.as_deref()) else {
        return Ok(None);
    };
    let port = env.pg_port.unwrap_or(DEFAULT_PG_PORT);

    let mut url = Url::parse(&format!("postgresql://{host}:{port}/{database}"))
        .map_err(|err| invalid("PGHOST", host, &err.to_string()))?;
    if let Some(user) = env.pg_user.as_deref() {
        url.set_username(user)
            .map_err(|_| invalid("PGUSER", user, "cannot be encoded into a URL"))?;
    }
    if let Some(password) = env.pg_password.as_deref() {
        url.set_password(Some(password))
            .map_err(|_| invalid("PGPASSWORD", "<redacted>", "cannot be encoded into a URL"))?;
    }
    Ok(Some(url.to_string()))
}

fn validate(key: &'static str, raw: &str) -> Result<String, ConfigLoadError> {
    validate_url(key, raw.trim()).map(|_| raw.trim().to_string())
}

fn validate_url(key: &'static str, raw: &str) -> Result<Url, ConfigLoadError> {
    let parsed = Url::parse(raw).map_err(|err| invalid(key, &redact(raw), &err.to_string()))?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(parsed),
        other => Err(invalid(
            key,
            &redact(raw),
            &format!("unsupported scheme '{other}', expected postgres:// or postgresql://"),
        )),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigLoadError {
    ConfigLoadError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Replaces the password of a connection URL for logging.
pub fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<unparseable>".to_string(),
    }
}
