//! Admission decisions for admin and share-upload routes
//!
//! Token failures never surface directly: they downgrade the caller to
//! "not admin" and the next fallback (password, then open-upload policy)
//! gets a chance. Only when nothing is left does a 401 or 403 come out.

use std::sync::Arc;

use crate::config::{AuthConfig, RuntimeSettings, UploadPolicy};
use crate::crypto::constant_time_str_eq;
use crate::token::{Claims, TokenCodec};
use crate::AuthError;

/// Authorization scheme marker expected on bearer credentials
pub const BEARER_PREFIX: &str = "Bearer ";

/// Path prefix of the share-upload route family
pub const SHARE_PATH_PREFIX: &str = "/share/";

/// Form field carrying the admin password on plain uploads
pub const PASSWORD_FIELD: &str = "password";

/// Header carrying the admin password on chunked uploads
pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

const MSG_ADMIN_UNAUTHORIZED: &str = "unauthorized or authorization check failed";
const MSG_GUEST_UPLOAD_DISABLED: &str =
    "guest uploads are disabled on this site; log in to the admin panel to upload";
const MSG_WRONG_PASSWORD: &str = "wrong password";
const MSG_NO_CREDENTIAL: &str = "guest uploads are disabled on this site. You can: \
     1. add a 'password' field with the admin password to the upload form; \
     2. or send the admin password in the 'X-Admin-Password' request header";

/// Which family a guarded route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Admin panel and everything outside `/share/`
    Administrative,
    /// Upload routes guests may use when open upload is on
    ShareUpload,
}

impl RouteKind {
    /// Classify a request path
    pub fn from_path(path: &str) -> Self {
        if path.starts_with(SHARE_PATH_PREFIX) {
            Self::ShareUpload
        } else {
            Self::Administrative
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// The token ends at the next space. Returns `None` when the scheme marker
/// is missing.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix(BEARER_PREFIX)
        .and_then(|rest| rest.split(' ').next())
}

/// Resolves admission for a single request.
///
/// Cheap to clone; clones share the codec, the admin secret and the policy.
#[derive(Clone)]
pub struct AccessResolver {
    codec: TokenCodec,
    admin_secret: Arc<str>,
    policy: Arc<dyn UploadPolicy>,
}

impl AccessResolver {
    /// Create a resolver.
    ///
    /// `admin_secret` must be the same secret the codec was keyed with.
    pub fn new(
        codec: TokenCodec,
        admin_secret: impl Into<Arc<str>>,
        policy: Arc<dyn UploadPolicy>,
    ) -> Self {
        Self {
            codec,
            admin_secret: admin_secret.into(),
            policy,
        }
    }

    /// Build a resolver whose codec and password share `config.admin_token`.
    ///
    /// The open-upload setting starts at `config.open_upload`; the returned
    /// [`RuntimeSettings`] is the handle for toggling it later.
    pub fn from_config(config: &AuthConfig) -> Result<(Self, Arc<RuntimeSettings>), AuthError> {
        let codec = TokenCodec::from_secret(&config.admin_token)
            .map_err(|e| AuthError::Configuration(e.to_string()))?
            .with_default_ttl(config.token_ttl);
        let settings = Arc::new(RuntimeSettings::new(config.open_upload));
        tracing::info!(open_upload = config.open_upload, "access resolver configured");
        let resolver = Self::new(codec, config.admin_token.as_str(), settings.clone());
        Ok((resolver, settings))
    }

    /// The codec used for bearer tokens
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Current open-upload setting, read fresh
    pub fn open_upload(&self) -> bool {
        self.policy.open_upload()
    }

    /// Exchange the admin password for a signed admin token
    pub fn login(&self, password: &str) -> Result<String, AuthError> {
        if !self.password_matches(password) {
            tracing::warn!("admin login rejected");
            return Err(AuthError::Unauthorized(MSG_WRONG_PASSWORD.to_string()));
        }
        tracing::info!("admin login succeeded");
        Ok(self.codec.create(&Claims::admin()))
    }

    /// Guard for admin routes, classifying the route by its path
    pub fn admin_guard(&self, bearer: Option<&str>, path: &str) -> Result<bool, AuthError> {
        self.admin_guard_for(bearer, RouteKind::from_path(path))
    }

    /// Guard for admin routes.
    ///
    /// Share-upload routes admit anyone while open upload is on and admins
    /// otherwise (403 if neither). Every other route admits admins only (401).
    /// Returns whether the caller is an admin.
    pub fn admin_guard_for(&self, bearer: Option<&str>, route: RouteKind) -> Result<bool, AuthError> {
        let is_admin = self.bearer_is_admin(bearer);

        match route {
            RouteKind::ShareUpload => {
                if !is_admin && !self.open_upload() {
                    tracing::info!(?route, "guest upload rejected: open upload disabled");
                    return Err(AuthError::Forbidden(MSG_GUEST_UPLOAD_DISABLED.to_string()));
                }
            }
            RouteKind::Administrative => {
                if !is_admin {
                    tracing::info!(?route, "admin route rejected: caller is not admin");
                    return Err(AuthError::Unauthorized(MSG_ADMIN_UNAUTHORIZED.to_string()));
                }
            }
        }

        tracing::debug!(?route, is_admin, "admin guard admitted request");
        Ok(is_admin)
    }

    /// Guard for plain uploads; the password comes from the `password` form field
    pub fn share_upload_guard(
        &self,
        bearer: Option<&str>,
        form_password: Option<&str>,
    ) -> Result<bool, AuthError> {
        self.share_upload_resolve(bearer, form_password)
    }

    /// Guard for chunked uploads; the password comes from `X-Admin-Password`
    pub fn share_chunk_guard(
        &self,
        bearer: Option<&str>,
        header_password: Option<&str>,
    ) -> Result<bool, AuthError> {
        self.share_upload_resolve(bearer, header_password)
    }

    /// Shared admission logic for the share-upload route family.
    ///
    /// With open upload on, everyone is admitted without looking at the
    /// credentials. Otherwise an admin token wins, then the password is
    /// checked: a wrong password is a 401, no usable credential at all is
    /// a 403. Empty strings count as absent.
    pub fn share_upload_resolve(
        &self,
        bearer: Option<&str>,
        secret: Option<&str>,
    ) -> Result<bool, AuthError> {
        if self.open_upload() {
            tracing::debug!("share upload admitted: open upload enabled");
            return Ok(true);
        }

        if self.bearer_is_admin(bearer) {
            tracing::debug!("share upload admitted: admin token");
            return Ok(true);
        }

        match secret.filter(|s| !s.is_empty()) {
            Some(password) if self.password_matches(password) => {
                tracing::debug!("share upload admitted: admin password");
                Ok(true)
            }
            Some(_) => {
                tracing::warn!("share upload rejected: wrong admin password");
                Err(AuthError::Unauthorized(MSG_WRONG_PASSWORD.to_string()))
            }
            None => {
                tracing::info!("share upload rejected: no credential supplied");
                Err(AuthError::Forbidden(MSG_NO_CREDENTIAL.to_string()))
            }
        }
    }

    /// Whether the bearer credential carries a valid admin token.
    ///
    /// Missing scheme, verification failure and a missing `is_admin` claim
    /// all yield `false`.
    fn bearer_is_admin(&self, bearer: Option<&str>) -> bool {
        let Some(token) = bearer.and_then(bearer_token) else {
            return false;
        };
        match self.codec.verify(token) {
            Ok(claims) => claims.is_admin(),
            Err(e) => {
                tracing::debug!(reason = e.kind_code(), "bearer token ignored");
                false
            }
        }
    }

    fn password_matches(&self, password: &str) -> bool {
        constant_time_str_eq(password, &self.admin_secret)
    }
}

impl std::fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver")
            .field("codec", &self.codec)
            .field("open_upload", &self.open_upload())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RuntimeSettings;

    const SECRET: &str = "FileCodeBox2023";
    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        resolver: AccessResolver,
        settings: Arc<RuntimeSettings>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new(open_upload: bool) -> Self {
            let clock = Arc::new(ManualClock::new(NOW));
            let settings = Arc::new(RuntimeSettings::new(open_upload));
            let codec = TokenCodec::from_secret(SECRET)
                .unwrap()
                .with_clock(clock.clone());
            let resolver = AccessResolver::new(codec, SECRET, settings.clone());
            Self {
                resolver,
                settings,
                clock,
            }
        }

        fn bearer(&self, claims: &Claims) -> String {
            format!("Bearer {}", self.resolver.codec().create(claims))
        }

        fn admin_bearer(&self) -> String {
            self.bearer(&Claims::admin())
        }
    }

    #[test]
    fn test_route_kind_from_path() {
        assert_eq!(RouteKind::from_path("/share/file/"), RouteKind::ShareUpload);
        assert_eq!(RouteKind::from_path("/share/text/"), RouteKind::ShareUpload);
        assert_eq!(RouteKind::from_path("/admin/file/list"), RouteKind::Administrative);
        assert_eq!(RouteKind::from_path("/share"), RouteKind::Administrative);
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer abc extra"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), Some(""));
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_admin_guard_share_route_open_upload_no_credential() {
        let fx = Fixture::new(true);
        assert_eq!(fx.resolver.admin_guard(None, "/share/file/"), Ok(false));
    }

    #[test]
    fn test_admin_guard_share_route_closed_upload_no_credential() {
        let fx = Fixture::new(false);
        let err = fx.resolver.admin_guard(None, "/share/file/").unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_admin_guard_share_route_closed_upload_admin() {
        let fx = Fixture::new(false);
        let bearer = fx.admin_bearer();
        assert_eq!(fx.resolver.admin_guard(Some(bearer.as_str()), "/share/file/"), Ok(true));
    }

    #[test]
    fn test_admin_guard_admin_route_no_credential() {
        for open_upload in [true, false] {
            let fx = Fixture::new(open_upload);
            let err = fx.resolver.admin_guard(None, "/admin/file/list").unwrap_err();
            assert_eq!(err.status_code(), 401);
            assert_eq!(err.detail(), MSG_ADMIN_UNAUTHORIZED);
        }
    }

    #[test]
    fn test_admin_guard_admin_route_admin_token() {
        let fx = Fixture::new(false);
        let bearer = fx.admin_bearer();
        assert_eq!(fx.resolver.admin_guard(Some(bearer.as_str()), "/admin/config"), Ok(true));
    }

    #[test]
    fn test_admin_guard_non_admin_token_is_unauthorized() {
        let fx = Fixture::new(true);
        let mut claims = Claims::new();
        claims.insert("name", "guest");
        let bearer = fx.bearer(&claims);

        let err = fx.resolver.admin_guard(Some(bearer.as_str()), "/admin").unwrap_err();
        assert_eq!(err.status_code(), 401);

        // Valid but non-admin tokens still pass share routes under open upload
        assert_eq!(fx.resolver.admin_guard(Some(bearer.as_str()), "/share/file/"), Ok(false));
    }

    #[test]
    fn test_admin_guard_ignores_bad_tokens() {
        let fx = Fixture::new(false);
        for bearer in [
            "Bearer garbage",
            "Bearer a.b.c",
            "Token something",
            "Bearer ",
        ] {
            let err = fx.resolver.admin_guard(Some(bearer), "/admin").unwrap_err();
            assert_eq!(err.status_code(), 401);
        }
    }

    #[test]
    fn test_admin_guard_expired_token() {
        let fx = Fixture::new(false);
        let bearer = fx.admin_bearer();
        fx.clock.advance(2_592_000);
        let err = fx.resolver.admin_guard(Some(bearer.as_str()), "/admin").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_share_resolve_open_upload_skips_credentials() {
        let fx = Fixture::new(true);
        assert_eq!(fx.resolver.share_upload_resolve(None, None), Ok(true));
        // A wrong password is never even inspected
        assert_eq!(fx.resolver.share_upload_resolve(Some("Bearer junk"), Some("wrong")), Ok(true));
    }

    #[test]
    fn test_share_resolve_admin_token_skips_secret() {
        let fx = Fixture::new(false);
        let bearer = fx.admin_bearer();
        assert_eq!(fx.resolver.share_upload_resolve(Some(bearer.as_str()), Some("wrong")), Ok(true));
    }

    #[test]
    fn test_share_resolve_correct_secret() {
        let fx = Fixture::new(false);
        assert_eq!(fx.resolver.share_upload_resolve(None, Some(SECRET)), Ok(true));
    }

    #[test]
    fn test_share_resolve_wrong_secret() {
        let fx = Fixture::new(false);
        let err = fx.resolver.share_upload_resolve(None, Some("nope")).unwrap_err();
        assert_eq!(err, AuthError::Unauthorized(MSG_WRONG_PASSWORD.to_string()));
    }

    #[test]
    fn test_share_resolve_no_credential() {
        let fx = Fixture::new(false);
        let err = fx.resolver.share_upload_resolve(None, None).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(err.detail().contains(PASSWORD_FIELD));
        assert!(err.detail().contains(ADMIN_PASSWORD_HEADER));
    }

    #[test]
    fn test_share_resolve_empty_secret_counts_as_absent() {
        let fx = Fixture::new(false);
        let err = fx.resolver.share_upload_resolve(None, Some("")).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_share_resolve_bad_token_falls_through_to_secret() {
        let fx = Fixture::new(false);
        assert_eq!(
            fx.resolver.share_upload_resolve(Some("Bearer forged.token.value"), Some(SECRET)),
            Ok(true)
        );

        let err = fx
            .resolver
            .share_upload_resolve(Some("Bearer forged.token.value"), None)
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_share_resolve_non_admin_token_falls_through() {
        let fx = Fixture::new(false);
        let bearer = fx.bearer(&Claims::new());

        let err = fx.resolver.share_upload_resolve(Some(bearer.as_str()), Some("nope")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_share_guards_share_resolution() {
        let fx = Fixture::new(false);
        assert_eq!(fx.resolver.share_upload_guard(None, Some(SECRET)), Ok(true));
        assert_eq!(fx.resolver.share_chunk_guard(None, Some(SECRET)), Ok(true));
        assert_eq!(
            fx.resolver.share_chunk_guard(None, Some("nope")).unwrap_err().status_code(),
            401
        );
    }

    #[test]
    fn test_policy_is_read_per_call() {
        let fx = Fixture::new(false);
        assert!(fx.resolver.share_upload_resolve(None, None).is_err());

        fx.settings.set_open_upload(true);
        assert_eq!(fx.resolver.share_upload_resolve(None, None), Ok(true));
        assert_eq!(fx.resolver.admin_guard(None, "/share/file/"), Ok(false));
    }

    #[test]
    fn test_login_issues_admin_token() {
        let fx = Fixture::new(false);
        let token = fx.resolver.login(SECRET).unwrap();
        let claims = fx.resolver.codec().verify(&token).unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.exp(), Some(NOW + 2_592_000));

        let bearer = format!("Bearer {token}");
        assert_eq!(fx.resolver.admin_guard(Some(bearer.as_str()), "/admin"), Ok(true));
    }

    #[test]
    fn test_login_wrong_password() {
        let fx = Fixture::new(false);
        let err = fx.resolver.login("FileCodeBox2024").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_from_config_uses_ttl_and_secret() {
        let config = AuthConfig::new(SECRET)
            .with_token_ttl(std::time::Duration::from_secs(60))
            .with_open_upload(false);
        let (resolver, _) = AccessResolver::from_config(&config).unwrap();
        assert_eq!(resolver.codec().default_ttl_secs(), 60);
        assert_eq!(resolver.share_upload_resolve(None, Some(SECRET)), Ok(true));
    }

    #[test]
    fn test_from_config_closed_upload_rejects_guests() {
        let config = AuthConfig::from_lookup(|key: &str| match key {
            "ADMIN_TOKEN" => Some(SECRET.to_string()),
            "OPEN_UPLOAD" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();
        let (resolver, settings) = AccessResolver::from_config(&config).unwrap();

        assert!(!resolver.open_upload());
        let err = resolver.share_upload_resolve(None, None).unwrap_err();
        assert_eq!(err.status_code(), 403);

        settings.set_open_upload(true);
        assert_eq!(resolver.share_upload_resolve(None, None), Ok(true));
    }

    #[test]
    fn test_from_config_open_upload_default() {
        let (resolver, _) = AccessResolver::from_config(&AuthConfig::new(SECRET)).unwrap();
        assert_eq!(resolver.share_upload_resolve(None, None), Ok(true));
    }

    #[test]
    fn test_from_config_rejects_empty_secret() {
        let config = AuthConfig::new("");
        let err = AccessResolver::from_config(&config).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_debug_hides_secret() {
        let fx = Fixture::new(true);
        assert!(!format!("{:?}", fx.resolver).contains(SECRET));
    }
}
