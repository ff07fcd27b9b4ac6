/// Maximum number of positional parameters a PostgreSQL statement may carry
/// (the wire protocol encodes the count as an unsigned 16-bit integer).
pub const POSTGRES_PLACEHOLDER_LIMIT: usize = 65535;

/// Accumulated parameter count above which the bulk writer flushes:
/// 80% of the protocol ceiling.
pub const FLUSH_THRESHOLD: usize = POSTGRES_PLACEHOLDER_LIMIT * 4 / 5;

/// Maximum length of the query text and argument list kept in error messages.
pub const ERROR_PREVIEW_LEN: usize = 100;

/// Always-true predicate used when no filter is supplied.
pub const TRUE_PREDICATE: &str = "1=1";

/// Stable no-op ordering appended to flexible list queries.
pub const NOOP_ORDER: &str = "(SELECT NULL)";

/// Timestamp layout PostgreSQL uses in array text output.
pub const DB_TIMESTAMPTZ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%#z";

/// Date layout accepted by the array parser.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
