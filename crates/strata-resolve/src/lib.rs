//! Member lookup and overload resolution for the Strata engine.
//!
//! Given a [`TypeEnv`](strata_types::TypeEnv) this crate answers the two questions a
//! checker asks of every expression that names something:
//!
//! - what does the simple or qualified name `x` refer to ([`Resolver::find_member`],
//!   [`Resolver::find_member_in_type`], [`Resolver::find_property`]), and
//! - which method does `recv.f(args)` call ([`Resolver::resolve_call`],
//!   [`Resolver::resolve_call_in_scope`], [`Resolver::resolve_constructor`]).
//!
//! Results are viewed through the receiver's type arguments lazily; see [`Member`].

#![forbid(unsafe_code)]

mod cache;
mod infer;
mod members;
mod overload;
mod resolver;
mod scopes;

pub use cache::MemberCache;
pub use members::{
    Member, MemberKind, MemberKinds, MemberOrigin, PropertyMembers, PropertyTarget,
};
pub use overload::{AppliedMethod, CallError, CallSite, MatchPhase};
pub use resolver::{this_type, AccessContext, Resolver};
pub use scopes::{ScopeData, ScopeEntry, ScopeId, ScopeKind, ScopeTree};
