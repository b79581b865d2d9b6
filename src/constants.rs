#![allow(dead_code)]

/// `openid.ns` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.4.1.2>
///
/// This particular value MUST be present for the request to be a valid OpenID Authentication 2.0 request.
///
/// Value: `http://specs.openid.net/auth/2.0`
pub(crate) const OPENID_NAMESPACE: &str = "openid.ns";

/// See [`OPENID_NAMESPACE`]
pub(crate) const OPENID_AUTH_NAMESPACE: &str = "http://specs.openid.net/auth/2.0";

/// See [`OPENID_IDENTITY`]
pub(crate) const OPENID_CLAIMED_ID: &str = "openid.claimed_id";

/// `openid.identity` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.9.1>
///
/// If a different OP-Local Identifier is not specified, the claimed identifier MUST be used as the value for `openid.identity`.
pub(crate) const OPENID_IDENTITY: &str = "openid.identity";

/// See [`OPENID_IDENTITY`]
pub(crate) const OPENID_IDENTIFIER_SELECT: &str =
    "http://specs.openid.net/auth/2.0/identifier_select";

/// `openid.mode`
/// - <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.1>
/// - <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.9.1>
/// - <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
/// - <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.11.4.2.1>
pub(crate) const OPENID_MODE: &str = "openid.mode";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_ASSOCIATE: &str = "associate";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_CHECKID_IMMEDIATE: &str = "checkid_immediate";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_CHECKID_SETUP: &str = "checkid_setup";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_IDENTIFIER_RESPONSE: &str = "id_res";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_CHECK_AUTHENTICATION: &str = "check_authentication";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_CANCEL: &str = "cancel";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_SETUP_NEEDED: &str = "setup_needed";

/// See [`OPENID_MODE`]
pub(crate) const OPENID_MODE_ERROR: &str = "error";

/// `openid.return_to` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.9.1>
///
/// URL to which the OP SHOULD return the User-Agent with the response indicating the status of the request.
pub(crate) const OPENID_RETURN_TO: &str = "openid.return_to";

/// `openid.realm` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.9.1>
///
/// URL pattern the OP SHOULD ask the end user to trust.
pub(crate) const OPENID_REALM: &str = "openid.realm";

/// The 1.1 spelling of [`OPENID_REALM`].
pub(crate) const OPENID_TRUST_ROOT: &str = "openid.trust_root";

/// `openid.user_setup_url` of a 1.1 negative assertion: where to send the
/// user so the OP can complete setup.
pub(crate) const OPENID_USER_SETUP_URL: &str = "openid.user_setup_url";

/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.3.2.1.1>
///
/// An OP Identifier Element is an `<xrd:Service>` element with the following information:
/// - An `<xrd:Type>` tag whose text content is `http://specs.openid.net/auth/2.0/server`.
/// - An `<xrd:URI>` tag whose text content is the OP Endpoint URL
pub(crate) const OPENID_PROVIDER_IDENTIFIER: &str = "http://specs.openid.net/auth/2.0/server";

/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.7.3.2.1.2>
///
/// A Claimed Identifier Element carries this `<xrd:Type>` and the OP
/// Endpoint URL in its `<xrd:URI>`.
pub(crate) const OPENID_SIGNON_IDENTIFIER: &str = "http://specs.openid.net/auth/2.0/signon";

/// Service types of the 1.x protocol family.
pub(crate) const OPENID_SIGNON_1_1: &str = "http://openid.net/signon/1.1";

/// See [`OPENID_SIGNON_1_1`]
pub(crate) const OPENID_SIGNON_1_0: &str = "http://openid.net/signon/1.0";

/// `openid.op_endpoint` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
///
/// The OP Endpoint URL.
pub(crate) const OPENID_OP_ENDPOINT: &str = "openid.op_endpoint";

/// `openid.response_nonce` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
///
/// A string 255 characters or less in length, that MUST be unique to this particular successful authentication response.
///
/// The nonce MUST start with the current time on the server,
/// and MAY contain additional ASCII characters in the range 33-126 inclusive (printable non-whitespace characters).
///
/// Example: `2005-05-15T17:11:51ZUNIQUE`
pub(crate) const OPENID_RESPONSE_NONCE: &str = "openid.response_nonce";

/// `openid.invalidate_handle` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
pub(crate) const OPENID_INVALIDATE_HANDLE: &str = "openid.invalidate_handle";

/// `openid.assoc_handle` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
///
/// The handle for the association that was used to sign this assertion.
pub(crate) const OPENID_ASSOCIATION_HANDLE: &str = "openid.assoc_handle";

/// `openid.assoc_type` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.3>
///
/// The algorithm the association's MAC key is used with.
///
/// Value: `HMAC-SHA1` or `HMAC-SHA256`
pub(crate) const OPENID_ASSOCIATION_TYPE: &str = "openid.assoc_type";

/// `openid.session_type` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.4>
///
/// How the MAC key travels in the association response.
///
/// Value: `no-encryption`, `DH-SHA1` or `DH-SHA256`
pub(crate) const OPENID_SESSION_TYPE: &str = "openid.session_type";

/// `openid.dh_consumer_public` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.1.2>
pub(crate) const OPENID_DH_CONSUMER_PUBLIC: &str = "openid.dh_consumer_public";

/// `openid.dh_modulus` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.1.2>
///
/// The default modulus from appendix B is implied when absent.
pub(crate) const OPENID_DH_MODULUS: &str = "openid.dh_modulus";

/// See [`OPENID_DH_MODULUS`]
pub(crate) const OPENID_DH_GEN: &str = "openid.dh_gen";

/// `openid.signed` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
///
/// Comma-separated list of signed fields, without the "openid." prefix.
///
/// This list MUST contain at least
/// - `op_endpoint`
/// - `return_to`
/// - `response_nonce`
/// - `assoc_handle`
///
/// and if present in the response
/// - `claimed_id`
/// - `identity`
pub(crate) const OPENID_SIGNED_FIELDS: &str = "openid.signed";

/// `openid.sig` <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.10.1>
///
/// Base 64 encoded signature.
pub(crate) const OPENID_SIGNATURE: &str = "openid.sig";

/// See [`OPENID_RESPONSE_NONCE`]
pub(crate) const OPENID_RESPONSE_NONCE_MAX_LEN: usize = 255;

pub(crate) const OPENID_FIELD_PREFIX: &str = "openid.";

/// `error_code` of a direct error response; the only value the engine
/// reacts to.
///
/// <https://openid.net/specs/openid-authentication-2_0.html#rfc.section.8.2.4>
pub(crate) const OPENID_ERROR_CODE_UNSUPPORTED_TYPE: &str = "unsupported-type";

/// <http://docs.oasis-open.org/xri/2.0/specs/cd02/xri-resolution-V2.0-cd-02.html#_Ref124065812>
pub(crate) const OPENID_PRIORITY_ATTRIBUTE: &str = "priority";
