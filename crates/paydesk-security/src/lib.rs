pub mod credentials;
pub mod errors;
pub mod headers;
pub mod redaction;
pub mod roles;
pub mod sanitize;

pub use credentials::{CredentialSource, CredentialStore, DEFAULT_EXPIRY_BUFFER, DEFAULT_TTL};
pub use errors::{SanitizedError, sanitize_error, sanitize_std_error};
pub use headers::{AuthorizedRequest, attach_credential, default_headers};
pub use redaction::{RedactingWriter, redact_secrets};
pub use roles::{decode_role_claim, resolve_role};
pub use sanitize::{sanitize_html, sanitize_input, sanitize_url_component, sanitize_value};
