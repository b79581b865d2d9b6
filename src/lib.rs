//! An OpenID Authentication 2.0 (with 1.1 fallback) relying-party engine.
//!
//! The [`RelyingParty`] drives one authentication exchange at a time:
//! normalization of the user-supplied identifier, discovery of the OP
//! endpoint, optional association negotiation, redirect construction and
//! cryptographic verification of the assertion the OP redirects back with.
//! HTTP transport, association persistence and discovery strategies are
//! injected collaborators.
//!
//! # Terminology
//!
//! ## **Identifier**
//!
//! An Identifier is either a "http" or "https" URI, (commonly referred to as a "URL" within this document), or an XRI.
//!
//! ## **Relying Party** (**RP**)
//!
//! A Web application that wants proof that the end user controls an Identifier.
//!
//! ## **OpenID Provider** (**OP**)
//!
//! An OpenID Authentication server on which a Relying Party relies for an assertion that the end user controls an Identifier.
//!
//! ## **OP Endpoint URL**
//!
//! The URL which accepts OpenID Authentication protocol messages, obtained by performing discovery on the User-Supplied Identifier. This value MUST be an absolute HTTP or HTTPS URL.
//!
//! ## **Claimed Identifier**
//!
//! An Identifier that the end user claims to own; the overall aim of the protocol is verifying this claim.
//!
//! ## **OP-Local Identifier**
//!
//! An alternate Identifier for an end user that is local to a particular OP and thus not necessarily under the end user's control.
//!
//! ## **Association**
//!
//! A shared secret between the RP and the OP, used to verify assertion signatures without a per-assertion round-trip to the OP.
//!
//! ## **Response Nonce**
//!
//! An OP-issued timestamp plus unique suffix preventing replay of assertions.

#![forbid(unsafe_code)]
#![warn(
    clippy::copy_iterator,
    clippy::default_trait_access,
    clippy::doc_link_with_quotes,
    clippy::enum_glob_use,
    clippy::expl_impl_clone_on_copy,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::items_after_statements,
    clippy::iter_not_returning_iterator,
    clippy::large_digit_groups,
    clippy::large_futures,
    clippy::large_stack_arrays,
    clippy::large_types_passed_by_value,
    clippy::manual_instant_elapsed,
    clippy::manual_let_else,
    clippy::manual_ok_or,
    clippy::manual_string_new,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::redundant_else,
    clippy::semicolon_if_nothing_returned,
    clippy::unnecessary_box_returns,
    clippy::unnecessary_join,
    clippy::unnecessary_wraps,
    clippy::unnested_or_patterns,
    clippy::used_underscore_binding
)]
#![warn(clippy::wildcard_dependencies)]
#![warn(
    clippy::branches_sharing_code,
    clippy::clear_with_drain,
    clippy::cognitive_complexity,
    clippy::collection_is_never_read,
    clippy::debug_assert_with_mut_call,
    clippy::derive_partial_eq_without_eq,
    clippy::empty_line_after_doc_comments,
    clippy::empty_line_after_outer_attr,
    clippy::equatable_if_let,
    clippy::fallible_impl_from,
    clippy::iter_on_empty_collections,
    clippy::iter_on_single_items,
    clippy::iter_with_drain,
    clippy::manual_clamp,
    clippy::needless_collect,
    clippy::nonstandard_macro_braces,
    clippy::or_fun_call,
    clippy::path_buf_push_overwrite,
    clippy::redundant_clone,
    clippy::suspicious_operation_groupings,
    clippy::trait_duplication_in_bounds,
    clippy::type_repetition_in_bounds,
    clippy::unnecessary_struct_initialization,
    clippy::unused_rounding,
    clippy::useless_let_if_seq
)]

mod associate;
mod association;
pub(crate) mod constants;
mod dh;
mod discovery;
mod http;
mod identifier;
mod nonce;
mod params;
mod rp;
mod signature;
mod store;
mod util;

pub use association::{validate_handle, AssocType, Association, HandleError, SessionType};
pub use discovery::{
    Discoverer, Discovery, DiscoveryHandler, HtmlDiscovery, ProtocolVersion, YadisDiscovery,
};
pub use http::{FetchResponse, HttpFetch, ReqwestFetcher};
pub use identifier::{Identifier, IdentifierKind};
pub use nonce::Nonce;
pub use params::Parameters;
pub use rp::{Outcome, RelyingParty};
pub use signature::{compute_signature, verify_signature};
pub use store::{AssociationStore, MemoryStore};
